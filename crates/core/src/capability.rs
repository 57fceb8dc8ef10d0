//! Capability grantor: the privileged primitives the bootstrap relies on.
//!
//! The grantor is attached once per process. It is the only way to record a
//! visibility relaxation, register a component with the loader, or override
//! process termination.

use crate::graph::{ComponentLoader, GraphLayer};
use crate::visibility::Relaxation;
use bootshim_api::{Accessor, ComponentRef, Relation};
use once_cell::sync::OnceCell;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use thiserror::Error;
use tracing::{debug, info, warn};

static GRANTOR: OnceCell<CapabilityGrantor> = OnceCell::new();

/// Active termination override, if any.
static EXIT_POLICY: Mutex<Option<Arc<dyn ExitPolicy>>> = Mutex::new(None);
/// Held by the live [`ExitOverride`]; only one may exist at a time.
static EXIT_SCOPE: Mutex<()> = Mutex::new(());
/// Thread holding [`EXIT_SCOPE`].
static EXIT_OWNER: Mutex<Option<ThreadId>> = Mutex::new(None);

#[derive(Debug)]
pub struct CapabilityGrantor {
    blanket: bool,
}

impl CapabilityGrantor {
    /// The process-wide grantor, created on first call.
    pub fn attach() -> &'static CapabilityGrantor {
        GRANTOR.get_or_init(|| {
            info!("Capability grantor attached");
            CapabilityGrantor { blanket: true }
        })
    }

    /// A grantor without the blanket relaxation capability.
    pub fn restricted(&self) -> CapabilityGrantor {
        CapabilityGrantor { blanket: false }
    }

    /// Whether relaxations towards every unnamed component are available.
    pub fn supports_blanket(&self) -> bool {
        self.blanket
    }

    /// Records that `package` of `component` is opened or exported to
    /// `accessor` on `layer`. Returns `false` if it already was.
    pub fn relax(
        &self,
        layer: &GraphLayer,
        component: &str,
        package: &str,
        accessor: Accessor,
        relation: Relation,
    ) -> bool {
        debug!(
            "{} {}/{}={}",
            relation.flag(),
            component,
            package,
            accessor
        );
        let relaxation = Relaxation {
            component: component.to_string(),
            package: package.to_string(),
            accessor,
            relation,
        };
        layer
            .visibility()
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(relaxation)
    }

    /// Makes `component` loadable by identity.
    pub fn register(&self, loader: &mut ComponentLoader, component: ComponentRef) {
        loader.register(component);
    }

    /// Installs `policy` as the process termination override until the
    /// returned guard is dropped.
    ///
    /// Waits while another thread holds an override. A second override on the
    /// thread that already holds one fails with [`OverrideActive`].
    pub fn intercept_exit(&self, policy: Arc<dyn ExitPolicy>) -> Result<ExitOverride, OverrideActive> {
        let me = thread::current().id();
        if *EXIT_OWNER.lock().unwrap_or_else(PoisonError::into_inner) == Some(me) {
            warn!("Exit override requested while one is already active on this thread");
            return Err(OverrideActive);
        }

        let scope = EXIT_SCOPE.lock().unwrap_or_else(PoisonError::into_inner);
        *EXIT_OWNER.lock().unwrap_or_else(PoisonError::into_inner) = Some(me);
        let previous = EXIT_POLICY
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(policy);
        Ok(ExitOverride {
            previous,
            _scope: scope,
        })
    }

    /// Override used around nested installer runs, see [`NoForceExit`].
    pub fn no_force_exit(&self) -> Result<(ExitOverride, Arc<NoForceExit>), OverrideActive> {
        let policy = Arc::new(NoForceExit::default());
        let guard = self.intercept_exit(policy.clone())?;
        Ok((guard, policy))
    }
}

/// A termination override is already installed by the calling thread.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("An exit override is already active on this thread")]
pub struct OverrideActive;

/// Decides whether a termination request is intercepted.
pub trait ExitPolicy: Send + Sync {
    /// `true` to turn the exit into an [`ExitIntercepted`] error.
    fn intercept(&self, status: i32) -> bool;
}

/// Intercepts a successful exit, and any failing exit that follows one.
///
/// Installers tend to call `exit(0)` when done, and their shutdown hooks may
/// then report `exit(1)`; neither may end the bootstrap.
#[derive(Debug, Default)]
pub struct NoForceExit {
    attempted: AtomicBool,
}

impl NoForceExit {
    /// Whether the guarded code tried to exit successfully.
    pub fn attempted(&self) -> bool {
        self.attempted.load(Ordering::SeqCst)
    }
}

impl ExitPolicy for NoForceExit {
    fn intercept(&self, status: i32) -> bool {
        match status {
            0 => {
                self.attempted.store(true, Ordering::SeqCst);
                true
            }
            1 => self.attempted(),
            _ => false,
        }
    }
}

/// Guard for an installed [`ExitPolicy`]; restores the previous one on drop.
#[must_use = "the override is removed when the guard is dropped"]
pub struct ExitOverride {
    previous: Option<Arc<dyn ExitPolicy>>,
    _scope: MutexGuard<'static, ()>,
}

impl std::fmt::Debug for ExitOverride {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExitOverride")
            .field("has_previous", &self.previous.is_some())
            .finish()
    }
}

impl Drop for ExitOverride {
    fn drop(&mut self) {
        *EXIT_POLICY.lock().unwrap_or_else(PoisonError::into_inner) = self.previous.take();
        // cleared before the scope guard field is released
        *EXIT_OWNER.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// A termination request that the active override turned into an error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Exit with status {status} was intercepted")]
pub struct ExitIntercepted {
    pub status: i32,
}

/// Terminates the process unless the active override intercepts `status`.
///
/// Entry points call this instead of [`std::process::exit`] so nested runs
/// can be contained.
pub fn exit(status: i32) -> Result<Infallible, ExitIntercepted> {
    let policy = EXIT_POLICY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if let Some(policy) = policy {
        if policy.intercept(status) {
            debug!("Intercepted exit with status {}", status);
            return Err(ExitIntercepted { status });
        }
    }
    warn!("Process exit requested with status {}", status);
    std::process::exit(status)
}

/// Whether a termination override is currently installed.
pub fn exit_intercepted() -> bool {
    EXIT_POLICY
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_returns_same_grantor() {
        let a = CapabilityGrantor::attach();
        let b = CapabilityGrantor::attach();
        assert!(std::ptr::eq(a, b));
        assert!(a.supports_blanket());
        assert!(!a.restricted().supports_blanket());
    }

    #[test]
    fn test_no_force_exit_policy() {
        let policy = NoForceExit::default();
        assert!(!policy.intercept(1));
        assert!(!policy.attempted());
        assert!(policy.intercept(0));
        assert!(policy.attempted());
        assert!(policy.intercept(1));
        assert!(!policy.intercept(2));
    }

    #[test]
    fn test_override_is_scoped() {
        let grantor = CapabilityGrantor::attach();
        {
            let (_guard, policy) = grantor.no_force_exit().unwrap();
            assert!(exit_intercepted());
            assert_eq!(exit(0), Err(ExitIntercepted { status: 0 }));
            assert_eq!(exit(1), Err(ExitIntercepted { status: 1 }));
            assert!(policy.attempted());
        }

        let guard = grantor.intercept_exit(Arc::new(NoForceExit::default())).unwrap();
        assert!(guard.previous.is_none());
    }

    #[test]
    fn test_nested_override_on_same_thread_fails() {
        let grantor = CapabilityGrantor::attach();
        {
            let (outer, policy) = grantor.no_force_exit().unwrap();
            assert!(outer.previous.is_none());

            assert_eq!(grantor.no_force_exit().unwrap_err(), OverrideActive);
            assert_eq!(
                grantor.intercept_exit(Arc::new(NoForceExit::default())).unwrap_err(),
                OverrideActive
            );

            // the outer override is still the one in force
            assert_eq!(exit(0), Err(ExitIntercepted { status: 0 }));
            assert!(policy.attempted());
        }

        let guard = grantor.intercept_exit(Arc::new(NoForceExit::default())).unwrap();
        assert!(guard.previous.is_none());
    }

    #[test]
    fn test_override_restored_after_panic() {
        let grantor = CapabilityGrantor::attach();
        let result = std::panic::catch_unwind(|| {
            let (_guard, _) = grantor.no_force_exit().unwrap();
            panic!("installer blew up");
        });
        assert!(result.is_err());

        // the scope lock is usable again and nothing leaked
        let guard = grantor.intercept_exit(Arc::new(NoForceExit::default())).unwrap();
        assert!(guard.previous.is_none());
        assert!(exit_intercepted());
    }
}
