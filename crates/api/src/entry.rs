use crate::error::TargetError;
use indexmap::IndexMap;
use std::path::PathBuf;

/// Everything handed to an entry point when control is delegated to it.
#[derive(Debug, Clone, Default)]
pub struct EntryContext {
    pub args: Vec<String>,
    /// Runtime properties (`-Dkey=value` assignments plus path properties).
    pub properties: IndexMap<String, String>,
    /// Directory the launch script lives in.
    pub working_dir: PathBuf,
}

impl EntryContext {
    pub fn new(args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            args,
            properties: IndexMap::new(),
            working_dir: working_dir.into(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// An invocable target registered under a qualified name.
pub trait EntryPoint: Send + Sync {
    fn invoke(&self, ctx: EntryContext) -> Result<(), TargetError>;
}

impl<F> EntryPoint for F
where
    F: Fn(EntryContext) -> Result<(), TargetError> + Send + Sync,
{
    fn invoke(&self, ctx: EntryContext) -> Result<(), TargetError> {
        self(ctx)
    }
}
