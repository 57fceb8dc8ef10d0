use bootshim_api::{RequestParseError, TargetError};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("Failed to read launch script {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to find start command in file {}", .path.display())]
    NoInvocation { path: PathBuf },
    #[error("Failed to read argument file {}: {source}", .path.display())]
    ArgumentFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Argument file {} includes itself", .path.display())]
    ArgumentFileCycle { path: PathBuf },
}

impl LocateError {
    /// The file the locator was looking at when it gave up.
    pub fn path(&self) -> &Path {
        match self {
            LocateError::Unreadable { path, .. }
            | LocateError::NoInvocation { path }
            | LocateError::ArgumentFile { path, .. }
            | LocateError::ArgumentFileCycle { path } => path,
        }
    }
}

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unreadable archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("Invalid component descriptor in {}: {message}", .path.display())]
    Descriptor { path: PathBuf, message: String },
    #[error(
        "Two versions of component {name} found in the same directory: {} and {}",
        .first.display(),
        .second.display()
    )]
    Duplicate {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("Component {requirement} not found, required by {component}")]
    Unresolved {
        component: String,
        requirement: String,
    },
    #[error("Module path is empty")]
    EmptyPath,
    #[error("Component layer was resolved against a root that is no longer active")]
    StaleParent,
}

#[derive(Error, Debug)]
pub enum VisibilityError {
    #[error(transparent)]
    Parse(#[from] RequestParseError),
    #[error("Unknown component {name} in {flag} request")]
    UnknownComponent { name: String, flag: &'static str },
    #[error("Blanket relaxation of {component}/{package} to ALL-UNNAMED is not available")]
    BlanketUnavailable { component: String, package: String },
}

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("Failed to find main class \"{name}\"")]
    NotRegistered { name: String },
    #[error("Failed to find main class \"{name}\": no component provides package '{package}'")]
    Unowned { name: String, package: String },
    #[error(transparent)]
    Visibility(#[from] VisibilityError),
}

#[derive(Error, Debug)]
pub enum InstallerError {
    #[error("No installer found in {} and none was specified", .dir.display())]
    NoInstaller { dir: PathBuf },
    #[error("Invalid installer source '{value}'")]
    InvalidSource { value: String },
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Unreadable installer package {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        source: zip::result::ZipError,
    },
    #[error("Installer {} does not declare a Main-Class", .path.display())]
    MissingEntryPoint { path: PathBuf },
    #[error("Installer entry point {name} declared by {} is not available", .path.display())]
    EntryPointUnavailable { name: String, path: PathBuf },
    #[error("Failed to download installer from {url}: {source}")]
    Download { url: String, source: reqwest::Error },
    #[error("Installer {} failed: {cause}", .path.display())]
    Failed { path: PathBuf, cause: TargetError },
    #[error("Installer {} was started from inside another installer run", .path.display())]
    Nested { path: PathBuf },
    #[error("Installer ran but {} is still missing", .path.display())]
    ScriptNotGenerated { path: PathBuf },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failures of the bootstrap itself. All of them end the process with status 1.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Visibility(#[from] VisibilityError),
    #[error(transparent)]
    Entry(#[from] EntryError),
    #[error(transparent)]
    Installer(#[from] InstallerError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Could not find module path (specified by -p) in {}", .script.display())]
    MissingModulePath { script: PathBuf },
    #[error("No entry point left on the command line of {}", .script.display())]
    MissingEntryPoint { script: PathBuf },
}

impl BootstrapError {
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Outcome of a failed launch: either the bootstrap broke, or the program it
/// delegated to failed on its own.
#[derive(Debug)]
pub enum LaunchError {
    Bootstrap(BootstrapError),
    /// The entry point's own error, untouched.
    Target(TargetError),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchError::Bootstrap(err) => fmt::Display::fmt(err, f),
            LaunchError::Target(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaunchError::Bootstrap(err) => err.source(),
            LaunchError::Target(err) => err.source(),
        }
    }
}

impl From<BootstrapError> for LaunchError {
    fn from(err: BootstrapError) -> Self {
        LaunchError::Bootstrap(err)
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
