//! Where an installer package comes from: a local file, or a download.

use crate::error::InstallerError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;
use walkdir::WalkDir;

/// File name suffix of installer packages found next to the launch script.
pub const INSTALLER_SUFFIX: &str = "-installer.jar";

pub const DEFAULT_DOWNLOAD_TEMPLATE: &str =
    "https://maven.neoforged.net/releases/net/neoforged/neoforge/{id}/neoforge-{id}-installer.jar";

const TEMPLATE_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerSource {
    Local(PathBuf),
    Remote { url: Url, file_name: String },
}

impl InstallerSource {
    /// Interprets an explicitly supplied installer.
    ///
    /// `value` is an `http(s)` URL, a path to an existing file or anything
    /// ending in `.jar`, or otherwise a short identifier (a version such as
    /// `21.1.145`) substituted into `template`.
    pub fn parse(value: &str, base_dir: &Path, template: &str) -> Result<Self, InstallerError> {
        let invalid = || InstallerError::InvalidSource {
            value: value.to_string(),
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(invalid());
        }

        if value.starts_with("http://") || value.starts_with("https://") {
            let url = Url::parse(value).map_err(|_| invalid())?;
            return Self::remote(url).ok_or_else(invalid);
        }

        let local = base_dir.join(value);
        if value.ends_with(".jar") || local.is_file() {
            return Ok(InstallerSource::Local(local));
        }

        let is_identifier = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'));
        if !is_identifier || !template.contains(TEMPLATE_PLACEHOLDER) {
            return Err(invalid());
        }
        let url = Url::parse(&template.replace(TEMPLATE_PLACEHOLDER, value)).map_err(|_| invalid())?;
        Self::remote(url).ok_or_else(invalid)
    }

    fn remote(url: Url) -> Option<Self> {
        let file_name = url
            .path_segments()?
            .next_back()
            .filter(|s| !s.is_empty())?
            .to_string();
        Some(InstallerSource::Remote { url, file_name })
    }

    /// Local path of the installer, downloading it into `base_dir` first if
    /// it is remote and not there yet.
    pub fn fetch(&self, base_dir: &Path) -> Result<PathBuf, InstallerError> {
        match self {
            InstallerSource::Local(path) => {
                if !path.is_file() {
                    return Err(InstallerError::Io {
                        path: path.clone(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "installer package does not exist",
                        ),
                    });
                }
                Ok(path.clone())
            }
            InstallerSource::Remote { url, file_name } => {
                let target = base_dir.join(file_name);
                if target.is_file() {
                    debug!("Reusing downloaded installer {}", target.display());
                    return Ok(target);
                }
                download(url, &target)?;
                Ok(target)
            }
        }
    }
}

/// First `*-installer.jar` directly inside `dir`, by file name.
pub fn search(dir: &Path) -> Result<Option<PathBuf>, InstallerError> {
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| InstallerError::Io {
            path: dir.to_path_buf(),
            source: e.into(),
        })?;
        let is_installer = entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.ends_with(INSTALLER_SUFFIX));
        if is_installer {
            return Ok(Some(entry.into_path()));
        }
    }
    Ok(None)
}

fn download(url: &Url, target: &Path) -> Result<(), InstallerError> {
    info!("Downloading installer from {}...", url);
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| InstallerError::Io { path, source }
    };
    let download_err = |source| InstallerError::Download {
        url: url.to_string(),
        source,
    };

    let partial = target.with_extension("jar.part");
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(io_err(target))?
        .block_on(async {
            let response = reqwest::get(url.clone())
                .await
                .and_then(reqwest::Response::error_for_status)
                .map_err(download_err)?;
            let bytes = response.bytes().await.map_err(download_err)?;
            tokio::fs::write(&partial, &bytes)
                .await
                .map_err(io_err(&partial))?;
            tokio::fs::rename(&partial, target)
                .await
                .map_err(io_err(target))
        })?;

    info!("Downloaded installer to {}", target.display());
    Ok(())
}
