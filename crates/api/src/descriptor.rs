use crate::Platform;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Fully expanded command line reconstructed from a launch script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchDescriptor {
    /// Script the invocation line was read from.
    pub script: PathBuf,
    /// Interpreter token that started the invocation line (dropped from `command`).
    pub interpreter: String,
    /// Invocation tokens before argument-file expansion.
    pub command: Vec<String>,
    /// Absolute paths of every argument file spliced in, in expansion order.
    pub argument_files: Vec<PathBuf>,
    /// Flattened argument list after expansion and stripping.
    pub arguments: Vec<String>,
}

impl LaunchDescriptor {
    /// Argument file generated for the given platform, if referenced.
    pub fn platform_args_file(&self, platform: Platform) -> Option<&Path> {
        self.argument_files
            .iter()
            .map(PathBuf::as_path)
            .find(|path| path.file_name().is_some_and(|name| name == platform.args_file()))
    }

    /// Version folder the platform argument file lives in
    /// (e.g. `21.1.145` for `libraries/.../21.1.145/unix_args.txt`).
    pub fn installed_version(&self, platform: Platform) -> Option<String> {
        self.platform_args_file(platform).and_then(version_folder)
    }
}

/// Name of the directory directly containing `path`.
pub fn version_folder(path: &Path) -> Option<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
}
