//! Runtime component graph.
//!
//! A [`GraphLayer`] is a resolved set of components layered on a parent.
//! [`install`] resolves a new layer on top of the active root without touching
//! it; [`RuntimeRoot::commit`] registers the layer's components with the
//! loader and swaps the root in one step.

pub mod finder;
pub mod image;
pub mod loader;
pub mod module_info;

pub use finder::{ComponentFinder, PathFinder, StaticFinder};
pub use loader::ComponentLoader;

use crate::capability::CapabilityGrantor;
use crate::error::GraphError;
use crate::visibility::VisibilityTable;
use bootshim_api::{Accessor, ComponentRef, Relation};
use indexmap::{IndexMap, IndexSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

pub struct GraphLayer {
    components: IndexMap<String, ComponentRef>,
    /// Read edges: component -> component it requires (possibly in a parent).
    edges: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
    parent: Option<Arc<GraphLayer>>,
    visibility: RwLock<VisibilityTable>,
}

impl std::fmt::Debug for GraphLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphLayer")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl GraphLayer {
    fn with_components(components: Vec<ComponentRef>, parent: Option<Arc<GraphLayer>>) -> Self {
        let mut layer = Self {
            components: IndexMap::new(),
            edges: DiGraph::new(),
            nodes: HashMap::new(),
            parent,
            visibility: RwLock::new(VisibilityTable::default()),
        };
        for component in components {
            layer.node(component.name());
            layer
                .components
                .insert(component.name().to_string(), component);
        }
        layer
    }

    /// Root layer holding the runtime image and the bootstrap component.
    pub fn boot() -> Self {
        Self::with_components(image::boot_components(), None)
    }

    /// Root layer with an explicit component set.
    pub fn root(components: Vec<ComponentRef>) -> Self {
        Self::with_components(components, None)
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(name) {
            return idx;
        }
        let idx = self.edges.add_node(name.to_string());
        self.nodes.insert(name.to_string(), idx);
        idx
    }

    pub fn parent(&self) -> Option<&Arc<GraphLayer>> {
        self.parent.as_ref()
    }

    /// Components defined in this layer, in discovery order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentRef> {
        self.components.values()
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Looks `name` up in this layer, then in the parents.
    pub fn find_component(&self, name: &str) -> Option<&ComponentRef> {
        self.components
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.find_component(name)))
    }

    /// Component whose content holds `package`, searching parents last.
    pub fn find_package_owner(&self, package: &str) -> Option<&ComponentRef> {
        self.components
            .values()
            .find(|c| c.descriptor.contains_package(package))
            .or_else(|| {
                self.parent
                    .as_ref()
                    .and_then(|p| p.find_package_owner(package))
            })
    }

    /// Direct requirements of a component of this layer.
    pub fn requirements(&self, name: &str) -> Vec<String> {
        let Some(&start) = self.nodes.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<String> = self
            .edges
            .neighbors(start)
            .map(|idx| self.edges[idx].clone())
            .collect();
        names.sort();
        names
    }

    /// Everything a component of this layer reads, directly or transitively,
    /// following requirements into parent layers.
    pub fn transitive_requirements(&self, name: &str) -> Vec<String> {
        let mut seen: IndexSet<String> = IndexSet::new();
        self.collect_requirements(name, &mut seen);
        seen.shift_remove(name);
        seen.into_iter().collect()
    }

    fn collect_requirements(&self, name: &str, seen: &mut IndexSet<String>) {
        let Some(&start) = self.nodes.get(name) else {
            if let Some(parent) = &self.parent {
                parent.collect_requirements(name, seen);
            }
            return;
        };
        let mut dfs = Dfs::new(&self.edges, start);
        while let Some(idx) = dfs.next(&self.edges) {
            let found = &self.edges[idx];
            if !seen.insert(found.clone()) {
                continue;
            }
            if !self.components.contains_key(found) {
                if let Some(parent) = &self.parent {
                    parent.collect_requirements(found, seen);
                }
            }
        }
    }

    /// Whether `package` of `component` is exported to `accessor`, by
    /// declaration or by a recorded relaxation in this layer or a parent.
    pub fn is_exported(&self, component: &str, package: &str, accessor: &Accessor) -> bool {
        let declared = self.find_component(component).is_some_and(|c| match accessor {
            Accessor::Named(name) => c.descriptor.exports_to(package, name),
            Accessor::Unnamed => c.descriptor.exports_unqualified(package),
        });
        declared || self.relaxed(component, package, accessor, Relation::Export)
    }

    /// Whether `package` of `component` is open for deep reflection by `accessor`.
    pub fn is_open(&self, component: &str, package: &str, accessor: &Accessor) -> bool {
        let declared = self.find_component(component).is_some_and(|c| match accessor {
            Accessor::Named(name) => c.descriptor.opens_to(package, name),
            Accessor::Unnamed => c.descriptor.opens_unqualified(package),
        });
        declared || self.relaxed(component, package, accessor, Relation::Open)
    }

    fn relaxed(&self, component: &str, package: &str, accessor: &Accessor, relation: Relation) -> bool {
        let here = self
            .visibility
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .allows(component, package, accessor, relation);
        here || self
            .parent
            .as_ref()
            .is_some_and(|p| p.relaxed(component, package, accessor, relation))
    }

    pub(crate) fn visibility(&self) -> &RwLock<VisibilityTable> {
        &self.visibility
    }

    /// Snapshot of the relaxations recorded on this layer.
    pub fn relaxations(&self) -> VisibilityTable {
        self.visibility
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Layer resolved against a root but not active yet.
#[derive(Debug)]
pub struct StagedLayer {
    layer: GraphLayer,
}

impl StagedLayer {
    pub fn layer(&self) -> &GraphLayer {
        &self.layer
    }
}

/// Resolves the components found by `finder` into a layer whose parent is the
/// current root.
///
/// The configuration is limited to exactly the discovered components; each
/// mandatory requirement must be one of them or already visible from the
/// root. Nothing is registered or activated here.
pub fn install(root: &RuntimeRoot, finder: &dyn ComponentFinder) -> Result<StagedLayer, GraphError> {
    let discovered = finder.find_all()?;
    if discovered.is_empty() {
        return Err(GraphError::EmptyPath);
    }

    let parent = root.current();
    let discovered_names: IndexSet<&str> = discovered.iter().map(ComponentRef::name).collect();

    let mut edges: Vec<(String, String)> = Vec::new();
    for component in &discovered {
        for requirement in &component.descriptor.requires {
            let satisfied = discovered_names.contains(requirement.name.as_str())
                || parent.find_component(&requirement.name).is_some();
            if satisfied {
                edges.push((component.name().to_string(), requirement.name.clone()));
            } else if requirement.optional {
                debug!(
                    "Optional requirement {} of {} is absent",
                    requirement.name,
                    component.name()
                );
            } else {
                return Err(GraphError::Unresolved {
                    component: component.name().to_string(),
                    requirement: requirement.name.clone(),
                });
            }
        }
    }

    let mut layer = GraphLayer::with_components(discovered, Some(parent));
    for (from, to) in edges {
        let from = layer.node(&from);
        let to = layer.node(&to);
        layer.edges.add_edge(from, to, ());
    }

    debug!("Resolved layer with {} components", layer.components.len());
    Ok(StagedLayer { layer })
}

/// Handle on the process-wide active root layer and component loader.
///
/// Owned by the bootstrap and passed explicitly; [`commit`](Self::commit) is
/// the only way to change what is active.
#[derive(Debug)]
pub struct RuntimeRoot {
    active: Arc<GraphLayer>,
    loader: ComponentLoader,
    generation: u64,
}

impl RuntimeRoot {
    pub fn new(boot: GraphLayer) -> Self {
        let mut loader = ComponentLoader::new();
        for component in boot.components() {
            loader.register(component.clone());
        }
        Self {
            active: Arc::new(boot),
            loader,
            generation: 0,
        }
    }

    pub fn current(&self) -> Arc<GraphLayer> {
        Arc::clone(&self.active)
    }

    pub fn loader(&self) -> &ComponentLoader {
        &self.loader
    }

    /// Number of commits so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Registers the staged components with the loader, then makes the layer
    /// the active root. The previous root stays reachable only as its parent.
    ///
    /// Fails without changing anything if the root moved since the layer was
    /// resolved.
    pub fn commit(
        &mut self,
        staged: StagedLayer,
        grantor: &CapabilityGrantor,
    ) -> Result<Arc<GraphLayer>, GraphError> {
        let expected_parent = staged.layer.parent.as_ref();
        if !expected_parent.is_some_and(|p| Arc::ptr_eq(p, &self.active)) {
            return Err(GraphError::StaleParent);
        }

        let mut loader = self.loader.clone();
        for component in staged.layer.components() {
            grantor.register(&mut loader, component.clone());
        }

        let layer = Arc::new(staged.layer);
        self.loader = loader;
        self.active = Arc::clone(&layer);
        self.generation += 1;
        info!(
            "Activated component layer with {} components (generation {})",
            layer.components.len(),
            self.generation
        );
        Ok(layer)
    }
}
