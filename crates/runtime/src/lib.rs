use bootshim_core::{Bootstrap, BootstrapConfig, EntryPoints};

/// Assembles the bootstrap with every entry point linked into the binary.
///
/// Entry points come from `bootshim_core::entry_point!` registrations; an
/// embedder that registers none can still add them through
/// [`Bootstrap::entries_mut`].
pub fn build_default_bootstrap(config: BootstrapConfig) -> Bootstrap {
    let entries = EntryPoints::collected();
    if entries.is_empty() {
        tracing::warn!("No entry points are linked into this binary");
    } else {
        tracing::debug!("Linked entry points: {:?}", entries);
    }
    Bootstrap::new(config, entries)
}

/// Initializes the logging system for a specific component.
/// This delegates to the core logging module.
/// Returns `None` when the log directory is unusable; stderr logging still works.
pub fn init_logging(component: &str) -> Option<impl Drop> {
    bootshim_core::logging::init_logging(component, true)
}
