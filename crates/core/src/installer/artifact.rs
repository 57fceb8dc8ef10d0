//! Metadata of an installer package.

use crate::descriptor::select_invocation;
use crate::error::InstallerError;
use crate::manifest::{MAIN_CLASS, read_manifest};
use bootshim_api::Platform;
use bootshim_api::descriptor::version_folder;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

#[derive(Debug, Clone)]
pub struct InstallerArtifact {
    pub path: PathBuf,
    /// Declared `Main-Class` of the package.
    pub entry_point: String,
    /// Copy of the launch script the installer generates, if it ships one.
    pub embedded_script: Option<String>,
}

impl InstallerArtifact {
    pub fn open(path: &Path, platform: Platform) -> Result<Self, InstallerError> {
        let archive_err = |source| InstallerError::Archive {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(|source| InstallerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut archive = ZipArchive::new(file).map_err(archive_err)?;

        let entry_point = read_manifest(&mut archive)
            .map_err(archive_err)?
            .and_then(|mut attrs| attrs.shift_remove(MAIN_CLASS))
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| InstallerError::MissingEntryPoint {
                path: path.to_path_buf(),
            })?;

        let embedded_script = match archive.by_name(&platform.embedded_run_file()) {
            Ok(mut entry) => {
                let mut text = String::new();
                // a script we cannot decode only disables version comparison
                entry.read_to_string(&mut text).ok().map(|_| text)
            }
            Err(zip::result::ZipError::FileNotFound) => None,
            Err(e) => return Err(archive_err(e)),
        };

        Ok(Self {
            path: path.to_path_buf(),
            entry_point: entry_point.trim().to_string(),
            embedded_script,
        })
    }

    /// Version this installer would install: the folder holding the platform
    /// argument file referenced by its embedded launch script.
    pub fn expected_version(&self, platform: Platform) -> Option<String> {
        let script = self.embedded_script.as_deref()?;
        let tokens = select_invocation(script, platform)?;
        let suffix = format!("/{}", platform.args_file());
        tokens
            .iter()
            .filter_map(|token| token.strip_prefix('@'))
            .map(|file| file.replace('\\', "/"))
            .find(|file| file.ends_with(&suffix))
            .and_then(|file| version_folder(Path::new(&file)))
    }
}
