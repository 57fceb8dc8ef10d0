pub mod component;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod platform;
pub mod relaxation;

pub use component::{ComponentDescriptor, ComponentKind, ComponentRef, PackageGrant, Requirement};
pub use descriptor::LaunchDescriptor;
pub use entry::{EntryContext, EntryPoint};
pub use error::{RequestParseError, TargetError};
pub use platform::Platform;
pub use relaxation::{Accessor, ALL_UNNAMED, Relation, RelaxTarget, RelaxationRequest};

/// Name of the component the bootstrap itself is registered as.
pub const BOOTSTRAP_COMPONENT: &str = "bootshim";
