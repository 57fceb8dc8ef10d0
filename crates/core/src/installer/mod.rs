//! Installer fallback.
//!
//! When the launch script is missing, or when reconciliation is requested
//! and the installed version differs from what the installer would produce,
//! the installer package is run in place with its exits intercepted.

pub mod artifact;
pub mod source;

pub use artifact::InstallerArtifact;
pub use source::{DEFAULT_DOWNLOAD_TEMPLATE, INSTALLER_SUFFIX, InstallerSource, search};

use crate::capability::{CapabilityGrantor, ExitIntercepted};
use crate::descriptor::locate;
use crate::entry::EntryPoints;
use crate::error::InstallerError;
use bootshim_api::{EntryContext, Platform};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Flag passed to installers to install into the working directory.
pub const INSTALL_FLAG: &str = "--installServer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InstallOutcome {
    /// The launch script exists and no reconciliation was requested.
    Present,
    /// The launch script was missing and the installer generated it.
    Installed,
    /// Installed and expected versions match.
    UpToDate { version: String },
    /// Versions differed or could not be read; the installer ran again.
    Reinstalled {
        installed: Option<String>,
        expected: Option<String>,
    },
}

impl InstallOutcome {
    pub fn ran_installer(&self) -> bool {
        matches!(self, InstallOutcome::Installed | InstallOutcome::Reinstalled { .. })
    }
}

pub struct Installer<'a> {
    base_dir: PathBuf,
    platform: Platform,
    entries: &'a EntryPoints,
    grantor: &'a CapabilityGrantor,
    template: String,
    flag: String,
}

impl<'a> Installer<'a> {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        platform: Platform,
        entries: &'a EntryPoints,
        grantor: &'a CapabilityGrantor,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            platform,
            entries,
            grantor,
            template: DEFAULT_DOWNLOAD_TEMPLATE.to_string(),
            flag: INSTALL_FLAG.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = flag.into();
        self
    }

    pub fn script_path(&self) -> PathBuf {
        self.base_dir.join(self.platform.run_file())
    }

    /// Makes sure the launch script exists, and with `force_reconcile` that
    /// it belongs to the version the installer provides.
    pub fn ensure_launch_artifacts(
        &self,
        explicit: Option<&str>,
        force_reconcile: bool,
    ) -> Result<InstallOutcome, InstallerError> {
        let script = self.script_path();

        if !script.is_file() {
            info!(
                "{} not found, running the installer",
                script.display()
            );
            let artifact = InstallerArtifact::open(&self.resolve(explicit)?, self.platform)?;
            self.run(&artifact)?;
            return Ok(InstallOutcome::Installed);
        }

        if !force_reconcile {
            return Ok(InstallOutcome::Present);
        }

        let installed = match locate(&script, self.platform) {
            Ok(descriptor) => descriptor.installed_version(self.platform),
            Err(e) => {
                warn!("{}", e);
                None
            }
        };
        let artifact = InstallerArtifact::open(&self.resolve(explicit)?, self.platform)?;
        let expected = artifact.expected_version(self.platform);

        match (installed, expected) {
            (Some(installed), Some(expected)) if installed == expected => {
                info!("Installed version {} is up to date", installed);
                Ok(InstallOutcome::UpToDate { version: installed })
            }
            (installed, expected) => {
                warn!(
                    "Installed version {} does not match installer version {}, reinstalling",
                    installed.as_deref().unwrap_or("<unknown>"),
                    expected.as_deref().unwrap_or("<unknown>")
                );
                self.run(&artifact)?;
                Ok(InstallOutcome::Reinstalled { installed, expected })
            }
        }
    }

    /// Installer package to use: the explicit source, else the first
    /// `*-installer.jar` next to the launch script.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<PathBuf, InstallerError> {
        match explicit {
            Some(value) => {
                InstallerSource::parse(value, &self.base_dir, &self.template)?.fetch(&self.base_dir)
            }
            None => search(&self.base_dir)?.ok_or_else(|| InstallerError::NoInstaller {
                dir: self.base_dir.clone(),
            }),
        }
    }

    /// Runs the installer's entry point with the install flag, with exit
    /// interception active for exactly the duration of the call.
    pub fn run(&self, artifact: &InstallerArtifact) -> Result<(), InstallerError> {
        let entry = self.entries.get(&artifact.entry_point).ok_or_else(|| {
            InstallerError::EntryPointUnavailable {
                name: artifact.entry_point.clone(),
                path: artifact.path.clone(),
            }
        })?;

        info!(
            "Running installer {} ({})",
            artifact.path.display(),
            artifact.entry_point
        );
        let ctx = EntryContext::new(vec![self.flag.clone()], &self.base_dir);
        let result = {
            let (_guard, policy) = self.grantor.no_force_exit().map_err(|_| {
                InstallerError::Nested {
                    path: artifact.path.clone(),
                }
            })?;
            let result = entry.invoke(ctx);
            if policy.attempted() {
                debug!("Installer attempted to exit the process");
            }
            result
        };

        match result {
            Ok(()) => {}
            Err(err) if err.is::<ExitIntercepted>() => {
                debug!("Swallowed installer exit: {}", err);
            }
            Err(cause) => {
                return Err(InstallerError::Failed {
                    path: artifact.path.clone(),
                    cause,
                });
            }
        }

        self.check_generated()
    }

    fn check_generated(&self) -> Result<(), InstallerError> {
        let script = self.script_path();
        if !script.is_file() {
            return Err(InstallerError::ScriptNotGenerated { path: script });
        }
        info!("Installer finished");
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
