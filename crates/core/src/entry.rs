//! Entry point registry, resolution and delegation.
//!
//! Entry points are looked up by qualified name (`net.neoforged.Main`) in an
//! explicit registry. Handlers linked into the binary register themselves
//! through [`entry_point!`](crate::entry_point); embedders can add more at run
//! time with [`EntryPoints::register`].

use crate::capability::CapabilityGrantor;
use crate::error::EntryError;
use crate::graph::GraphLayer;
use bootshim_api::{Accessor, BOOTSTRAP_COMPONENT, EntryContext, EntryPoint, Relation, TargetError};
use indexmap::IndexMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Function signature of a statically registered entry point.
pub type EntryHandler = fn(EntryContext) -> Result<(), TargetError>;

/// A statically registered entry point.
pub struct EntryPointDef {
    /// Qualified name, package first.
    pub name: &'static str,
    pub handler: EntryHandler,
}

/// Registry wrapper for link-time entry point definitions.
pub struct EntryPointReg(pub &'static EntryPointDef);
inventory::collect!(EntryPointReg);

/// Registers a handler under a qualified name at link time.
///
/// ```ignore
/// bootshim_core::entry_point!("net.neoforged.Main", run_server);
/// ```
#[macro_export]
macro_rules! entry_point {
    ($name:expr, $handler:expr $(,)?) => {
        $crate::inventory::submit! {
            $crate::entry::EntryPointReg(&$crate::entry::EntryPointDef {
                name: $name,
                handler: $handler,
            })
        }
    };
}

/// Qualified name to invocable handle.
#[derive(Clone, Default)]
pub struct EntryPoints {
    entries: IndexMap<String, Arc<dyn EntryPoint>>,
}

impl std::fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

impl EntryPoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry point submitted with [`entry_point!`](crate::entry_point).
    pub fn collected() -> Self {
        let mut entries = Self::new();
        for reg in inventory::iter::<EntryPointReg> {
            entries.register(reg.0.name, reg.0.handler);
        }
        entries
    }

    /// Adds or replaces the entry point registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, entry: impl EntryPoint + 'static) -> &mut Self {
        let name = name.into();
        if self.entries.insert(name.clone(), Arc::new(entry)).is_some() {
            debug!("Replaced entry point {}", name);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn EntryPoint>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An entry point bound to the component that declares it.
pub struct ResolvedEntry {
    pub name: String,
    pub component: String,
    target: Arc<dyn EntryPoint>,
}

impl std::fmt::Debug for ResolvedEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedEntry")
            .field("name", &self.name)
            .field("component", &self.component)
            .finish()
    }
}

/// Package part of a qualified name; empty for the unnamed package.
pub fn package_of(name: &str) -> &str {
    name.rsplit_once('.').map(|(package, _)| package).unwrap_or("")
}

/// Resolves `name` against `layer`.
///
/// The declaring component is the one providing the name's package. When
/// it does not export that package to the bootstrap component, the export
/// is granted first.
pub fn resolve(
    entries: &EntryPoints,
    name: &str,
    layer: &GraphLayer,
    grantor: &CapabilityGrantor,
) -> Result<ResolvedEntry, EntryError> {
    let target = entries.get(name).ok_or_else(|| EntryError::NotRegistered {
        name: name.to_string(),
    })?;

    let package = package_of(name);
    let component = layer
        .find_package_owner(package)
        .map(|c| c.name().to_string())
        .ok_or_else(|| EntryError::Unowned {
            name: name.to_string(),
            package: package.to_string(),
        })?;

    let bootstrap = Accessor::named(BOOTSTRAP_COMPONENT);
    if !layer.is_exported(&component, package, &bootstrap) {
        info!(
            "Exporting {}/{} to {} for entry point {}",
            component, package, BOOTSTRAP_COMPONENT, name
        );
        grantor.relax(layer, &component, package, bootstrap, Relation::Export);
    }

    Ok(ResolvedEntry {
        name: name.to_string(),
        component,
        target,
    })
}

/// Hands control to `entry`. Its error is returned as is; a panic is resumed
/// with its original payload.
pub fn delegate(entry: &ResolvedEntry, ctx: EntryContext) -> Result<(), TargetError> {
    info!(
        "Launching {} from {} with {} arguments",
        entry.name,
        entry.component,
        ctx.args.len()
    );
    let target = Arc::clone(&entry.target);
    match panic::catch_unwind(AssertUnwindSafe(move || target.invoke(ctx))) {
        Ok(result) => result,
        Err(payload) => {
            error!("Entry point {} panicked", entry.name);
            panic::resume_unwind(payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{RuntimeRoot, StaticFinder, install};
    use bootshim_api::{ComponentDescriptor, ComponentKind, ComponentRef, PackageGrant};
    use std::fmt;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct ServerCrashed(u32);

    impl fmt::Display for ServerCrashed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "server crashed with code {}", self.0)
        }
    }

    impl std::error::Error for ServerCrashed {}

    fn server(exports: Vec<PackageGrant>) -> ComponentRef {
        ComponentRef::new(
            ComponentDescriptor {
                name: "neoforge".into(),
                kind: ComponentKind::Explicit,
                open: false,
                requires: vec![],
                exports,
                opens: vec![],
                packages: ["net.neoforged.server".to_string()].into_iter().collect(),
            },
            "/libraries/neoforge.jar",
        )
    }

    fn noop(_ctx: EntryContext) -> Result<(), TargetError> {
        Ok(())
    }

    fn root_with(component: ComponentRef) -> RuntimeRoot {
        let mut root = RuntimeRoot::new(GraphLayer::boot());
        let staged = install(&root, &StaticFinder::new(vec![component])).unwrap();
        root.commit(staged, CapabilityGrantor::attach()).unwrap();
        root
    }

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("net.neoforged.server.Main"), "net.neoforged.server");
        assert_eq!(package_of("Main"), "");
    }

    #[test]
    fn test_unregistered_name() {
        let root = root_with(server(vec![]));
        let err = resolve(
            &EntryPoints::new(),
            "net.neoforged.server.Main",
            &root.current(),
            CapabilityGrantor::attach(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to find main class \"net.neoforged.server.Main\""
        );
    }

    #[test]
    fn test_self_granted_export() {
        let root = root_with(server(vec![]));
        let layer = root.current();
        let mut entries = EntryPoints::new();
        entries.register("net.neoforged.server.Main", noop);

        let bootstrap = Accessor::named(BOOTSTRAP_COMPONENT);
        assert!(!layer.is_exported("neoforge", "net.neoforged.server", &bootstrap));
        let resolved = resolve(
            &entries,
            "net.neoforged.server.Main",
            &layer,
            CapabilityGrantor::attach(),
        )
        .unwrap();
        assert_eq!(resolved.component, "neoforge");
        assert!(layer.is_exported("neoforge", "net.neoforged.server", &bootstrap));
        assert_eq!(layer.relaxations().len(), 1);
    }

    #[test]
    fn test_no_grant_when_already_exported() {
        let root = root_with(server(vec![PackageGrant::unqualified("net.neoforged.server")]));
        let layer = root.current();
        let mut entries = EntryPoints::new();
        entries.register("net.neoforged.server.Main", noop);

        resolve(&entries, "net.neoforged.server.Main", &layer, CapabilityGrantor::attach()).unwrap();
        assert!(layer.relaxations().is_empty());
    }

    #[test]
    fn test_unowned_package() {
        let root = root_with(server(vec![]));
        let mut entries = EntryPoints::new();
        entries.register("com.example.Main", noop);

        let err = resolve(&entries, "com.example.Main", &root.current(), CapabilityGrantor::attach())
            .unwrap_err();
        assert!(matches!(err, EntryError::Unowned { ref package, .. } if package == "com.example"));
    }

    #[test]
    fn test_delegate_passes_arguments_and_returns_target_error() {
        let root = root_with(server(vec![]));
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let recorder = Arc::clone(&seen);
        let mut entries = EntryPoints::new();
        entries.register("net.neoforged.server.Main", move |ctx: EntryContext| -> Result<(), TargetError> {
            *recorder.lock().unwrap() = ctx.args;
            Err(Box::new(ServerCrashed(7)) as TargetError)
        });

        let resolved = resolve(
            &entries,
            "net.neoforged.server.Main",
            &root.current(),
            CapabilityGrantor::attach(),
        )
        .unwrap();
        let err = delegate(&resolved, EntryContext::new(vec!["nogui".into()], "/srv")).unwrap_err();

        assert_eq!(*seen.lock().unwrap(), vec!["nogui"]);
        let crashed = err.downcast_ref::<ServerCrashed>().expect("original error type");
        assert_eq!(crashed.0, 7);
        assert_eq!(err.to_string(), "server crashed with code 7");
    }

    #[test]
    fn test_delegate_resumes_panics() {
        let root = root_with(server(vec![]));
        let mut entries = EntryPoints::new();
        entries.register("net.neoforged.server.Main", |_ctx: EntryContext| -> Result<(), TargetError> {
            panic!("boom")
        });
        let resolved = resolve(
            &entries,
            "net.neoforged.server.Main",
            &root.current(),
            CapabilityGrantor::attach(),
        )
        .unwrap();

        let payload = panic::catch_unwind(AssertUnwindSafe(|| {
            delegate(&resolved, EntryContext::default())
        }))
        .unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"boom"));
    }
}
