pub mod arguments;
pub mod bootstrap;
pub mod capability;
pub mod config;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod graph;
pub mod installer;
pub mod logging;
pub mod manifest;
pub mod tokenizer;
pub mod visibility;

pub use bootstrap::{Bootstrap, LaunchPlan, PreparedLaunch};
pub use capability::{CapabilityGrantor, ExitIntercepted, OverrideActive, exit};
pub use config::BootstrapConfig;
pub use entry::EntryPoints;
pub use error::{BootstrapError, LaunchError, Result};
pub use tokenizer::tokenize;

#[doc(hidden)]
pub use inventory;
