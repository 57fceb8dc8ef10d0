use bootshim_api::ComponentRef;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// Components loadable by identity. Filled in by the capability grantor only.
#[derive(Debug, Clone, Default)]
pub struct ComponentLoader {
    components: IndexMap<String, ComponentRef>,
    packages: HashMap<String, String>,
}

impl ComponentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&mut self, component: ComponentRef) {
        let name = component.name().to_string();
        for package in &component.descriptor.packages {
            self.packages.insert(package.clone(), name.clone());
        }
        if let Some(previous) = self.components.insert(name.clone(), component) {
            debug!(
                "Replaced loader registration of {} (was {})",
                name,
                previous.location.display()
            );
        }
    }

    pub fn get(&self, name: &str) -> Option<&ComponentRef> {
        self.components.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Component that defines `package`, if any registered one does.
    pub fn component_for_package(&self, package: &str) -> Option<&ComponentRef> {
        self.packages
            .get(package)
            .and_then(|name| self.components.get(name))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }
}
