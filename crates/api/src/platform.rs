use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Launch script flavour generated by the installer.
///
/// Detection of the active platform happens outside the bootstrap (CLI flag,
/// config file or host OS); everything downstream receives it as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Unix,
    Windows,
}

impl Platform {
    /// Platform of the running host.
    pub fn host() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Maps an OS name (`os.name` style or Rust `consts::OS` style) to a platform.
    pub fn from_os_name(name: &str) -> Self {
        if name.to_ascii_lowercase().starts_with("windows") {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Launch script file name, relative to the server directory.
    pub fn run_file(self) -> &'static str {
        match self {
            Platform::Unix => "run.sh",
            Platform::Windows => "run.bat",
        }
    }

    /// File name of the generated argument file that carries the module path.
    pub fn args_file(self) -> &'static str {
        match self {
            Platform::Unix => "unix_args.txt",
            Platform::Windows => "win_args.txt",
        }
    }

    /// Location of the launch script copy embedded in installer packages.
    pub fn embedded_run_file(self) -> String {
        format!("data/{}", self.run_file())
    }

    pub fn path_separator(self) -> char {
        match self {
            Platform::Unix => ':',
            Platform::Windows => ';',
        }
    }

    /// Whether a script line is a comment and never an invocation.
    pub fn is_comment(self, line: &str) -> bool {
        let line = line.trim_start();
        match self {
            Platform::Unix => line.starts_with('#'),
            Platform::Windows => {
                line.starts_with('@')
                    || line
                        .get(..4)
                        .is_some_and(|head| head.eq_ignore_ascii_case("rem "))
            }
        }
    }

    /// Tokens standing for "arguments forwarded by the caller".
    pub fn passthrough_markers(self) -> &'static [&'static str] {
        match self {
            Platform::Unix => &["$@", "$*"],
            Platform::Windows => &["%*"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Unix => f.write_str("unix"),
            Platform::Windows => f.write_str("windows"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unix" | "nix" | "linux" | "macos" => Ok(Platform::Unix),
            "windows" | "win" => Ok(Platform::Windows),
            other => Err(format!("unknown platform '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_comment_lines() {
        let platform = Platform::Windows;
        assert!(platform.is_comment("@echo off"));
        assert!(platform.is_comment("REM Forge requires a configured set of both JVM and program arguments."));
        assert!(platform.is_comment("rem lower case"));
        assert!(!platform.is_comment("java @user_jvm_args.txt %*"));
        assert!(!platform.is_comment("REMOTE thing"));
    }

    #[test]
    fn test_unix_comment_lines() {
        assert!(Platform::Unix.is_comment("#!/usr/bin/env sh"));
        assert!(Platform::Unix.is_comment("  # indented"));
        assert!(!Platform::Unix.is_comment("java @user_jvm_args.txt \"$@\""));
    }

    #[test]
    fn test_os_name_detection() {
        assert_eq!(Platform::from_os_name("Windows 11"), Platform::Windows);
        assert_eq!(Platform::from_os_name("windows"), Platform::Windows);
        assert_eq!(Platform::from_os_name("Linux"), Platform::Unix);
        assert_eq!(Platform::from_os_name("macos"), Platform::Unix);
    }
}
