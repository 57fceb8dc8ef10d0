use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Directory the rolling log files go to.
pub fn log_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| ".".into());
    home.join(".bootshim").join("logs")
}

/// Daily rolling appender in `dir`. Failures go to stderr since no
/// subscriber is installed yet.
fn file_appender(dir: &Path, component: &str) -> Option<RollingFileAppender> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "bootshim: cannot create log directory {}: {e}; file logging disabled",
            dir.display()
        );
        return None;
    }
    // Files are named like bootshim.log.2026-10-16
    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(format!("{component}.log"))
        .build(dir)
    {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("bootshim: cannot open log file in {}: {e}; file logging disabled", dir.display());
            None
        }
    }
}

/// Installs the global subscriber: a daily rolling file under
/// `~/.bootshim/logs` plus, with `to_stderr`, operator-facing output.
///
/// Returns the file writer's guard, or `None` when file logging is off.
pub fn init_logging(component: &str, to_stderr: bool) -> Option<WorkerGuard> {
    let (file_layer, guard) = match file_appender(&log_dir(), component) {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if to_stderr {
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .without_time();
        // a subscriber set by an embedder wins
        let _ = registry.with(stderr_layer).try_init();
    } else {
        let _ = registry.try_init();
    }

    guard
}
