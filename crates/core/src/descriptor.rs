//! Launch descriptor locator.
//!
//! Reads the installer-generated launch script, picks the line that starts
//! the runtime, and rebuilds the command line it would have produced: argument
//! files are spliced in place and flags that only matter before the runtime
//! starts are dropped.

use crate::error::LocateError;
use crate::tokenizer::tokenize;
use bootshim_api::{LaunchDescriptor, Platform};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const INTERPRETERS: &[&str] = &["java", "java.exe", "javaw", "javaw.exe"];

/// Tokens marking an invocation that only checks the environment (e.g. a
/// `java -version` probe) and must not be mistaken for the launch line.
const ONLY_CHECK_MARKERS: &[&str] = &["-version", "--version", "-showversion", "--dry-run"];

const TUNING_PREFIXES: &[&str] = &["-X", "-javaagent:", "-agentlib:", "-agentpath:"];
const TUNING_FLAGS: &[&str] = &[
    "-server",
    "-client",
    "-ea",
    "-da",
    "-esa",
    "-dsa",
    "-enableassertions",
    "-disableassertions",
];

const ARGUMENT_FILE_PREFIX: char = '@';

/// Reads `script` and reconstructs the command line it launches.
pub fn locate(script: &Path, platform: Platform) -> Result<LaunchDescriptor, LocateError> {
    let contents = std::fs::read_to_string(script).map_err(|source| LocateError::Unreadable {
        path: script.to_path_buf(),
        source,
    })?;

    let mut tokens = select_invocation(&contents, platform).ok_or_else(|| {
        LocateError::NoInvocation {
            path: script.to_path_buf(),
        }
    })?;
    let interpreter = tokens.remove(0);
    let markers = platform.passthrough_markers();
    tokens.retain(|token| !markers.contains(&token.as_str()));
    debug!(
        "Found launch command in {}: {} {:?}",
        script.display(),
        interpreter,
        tokens
    );

    let base_dir = script
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut expander = Expander::default();
    let mut arguments = expander.expand(&tokens, base_dir)?;
    arguments.retain(|arg| !is_environment_tuning(arg));

    Ok(LaunchDescriptor {
        script: script.to_path_buf(),
        interpreter,
        command: tokens,
        argument_files: expander.files,
        arguments,
    })
}

/// Tokens of the first relevant invocation line in a script, interpreter first.
pub fn select_invocation(contents: &str, platform: Platform) -> Option<Vec<String>> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty() && !platform.is_comment(line))
        .map(tokenize)
        .find(|tokens| {
            tokens.first().is_some_and(|first| is_interpreter(first))
                && !tokens
                    .iter()
                    .any(|token| ONLY_CHECK_MARKERS.contains(&token.as_str()))
        })
}

fn is_interpreter(token: &str) -> bool {
    let file_name = token.rsplit(['/', '\\']).next().unwrap_or(token);
    INTERPRETERS
        .iter()
        .any(|name| file_name.eq_ignore_ascii_case(name))
}

/// Flags that tune the runtime before it starts; meaningless once it runs.
fn is_environment_tuning(arg: &str) -> bool {
    TUNING_FLAGS.contains(&arg) || TUNING_PREFIXES.iter().any(|prefix| arg.starts_with(prefix))
}

#[derive(Default)]
struct Expander {
    /// Every argument file spliced in, in first-seen order.
    files: Vec<PathBuf>,
    /// Files currently being expanded, for cycle detection.
    stack: Vec<PathBuf>,
}

impl Expander {
    fn expand(&mut self, tokens: &[String], base_dir: &Path) -> Result<Vec<String>, LocateError> {
        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens {
            match token.strip_prefix(ARGUMENT_FILE_PREFIX) {
                Some(relative) if !relative.is_empty() => {
                    let path = resolve(base_dir, relative);
                    out.extend(self.expand_file(&path, base_dir)?);
                }
                _ => out.push(token.clone()),
            }
        }
        Ok(out)
    }

    fn expand_file(&mut self, path: &Path, base_dir: &Path) -> Result<Vec<String>, LocateError> {
        if self.stack.iter().any(|open| open == path) {
            return Err(LocateError::ArgumentFileCycle {
                path: path.to_path_buf(),
            });
        }
        let contents =
            std::fs::read_to_string(path).map_err(|source| LocateError::ArgumentFile {
                path: path.to_path_buf(),
                source,
            })?;
        trace!("Expanding argument file {}", path.display());

        if !self.files.iter().any(|seen| seen == path) {
            self.files.push(path.to_path_buf());
        }

        let tokens: Vec<String> = contents
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .flat_map(tokenize)
            .collect();

        self.stack.push(path.to_path_buf());
        let expanded = self.expand(&tokens, base_dir);
        self.stack.pop();
        expanded
    }
}

fn resolve(base_dir: &Path, relative: &str) -> PathBuf {
    let joined = base_dir.join(relative);
    std::path::absolute(&joined).unwrap_or(joined)
}
