/// Failure raised by a delegated entry point. Surfaced to the caller verbatim.
pub type TargetError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestParseError {
    #[error("expected <component>/<package>=<target>[,<target>...], got '{0}'")]
    Malformed(String),
    #[error("empty target list in '{0}'")]
    EmptyTargets(String),
}
