use crate::error::ConfigError;
use crate::installer::{DEFAULT_DOWNLOAD_TEMPLATE, INSTALL_FLAG};
use bootshim_api::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "bootshim.json";

/// Bootstrap settings: defaults, overlaid by `bootshim.json` in the base
/// directory, overlaid by command line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Directory holding the launch script; also the installer's target.
    #[serde(skip)]
    pub base_dir: PathBuf,
    /// Launch script flavour; the host's when unset.
    pub platform: Option<Platform>,
    /// Explicit installer: path, URL or version identifier.
    pub installer: Option<String>,
    pub download_template: String,
    pub installer_flag: String,
    /// Compare installed and installer versions on every start.
    pub reconcile: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            platform: None,
            installer: None,
            download_template: DEFAULT_DOWNLOAD_TEMPLATE.to_string(),
            installer_flag: INSTALL_FLAG.to_string(),
            reconcile: false,
        }
    }
}

impl BootstrapConfig {
    /// Defaults merged with `bootshim.json` from `base_dir`, if present.
    pub fn load(base_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let base_dir = base_dir.into();
        let path = base_dir.join(CONFIG_FILE);
        let mut config = if path.is_file() {
            debug!("Loading config from {}", path.display());
            Self::read(&path)?
        } else {
            Self::default()
        };
        config.base_dir = base_dir;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::host)
    }

    pub fn script_path(&self) -> PathBuf {
        self.base_dir.join(self.platform().run_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BootstrapConfig::load(dir.path()).unwrap();
        assert_eq!(config.base_dir, dir.path());
        assert_eq!(config.installer_flag, "--installServer");
        assert!(!config.reconcile);
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"{ "platform": "windows", "installer": "21.1.145", "reconcile": true }"#,
        )
        .unwrap();

        let config = BootstrapConfig::load(dir.path()).unwrap();
        assert_eq!(config.platform(), Platform::Windows);
        assert_eq!(config.installer.as_deref(), Some("21.1.145"));
        assert!(config.reconcile);
        assert_eq!(config.download_template, DEFAULT_DOWNLOAD_TEMPLATE);
        assert_eq!(config.script_path(), dir.path().join("run.bat"));
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ reconcile: yes").unwrap();
        let err = BootstrapConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
    }
}
