//! Destructive lookups over a reconstructed command line.
//!
//! Every recognised flag is removed together with its value as soon as it is
//! read, so nothing downstream sees it twice.

use indexmap::IndexMap;

const PROPERTY_PREFIX: &str = "-D";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentList {
    args: Vec<String>,
}

impl ArgumentList {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Removes the first `flag value` pair and returns the value.
    ///
    /// A flag in last position has no value; it is left in place and `None`
    /// is returned.
    pub fn take_value(&mut self, flag: &str) -> Option<String> {
        let idx = self.args.iter().position(|arg| arg == flag)?;
        if idx + 1 >= self.args.len() {
            return None;
        }
        self.args.remove(idx);
        Some(self.args.remove(idx))
    }

    /// Like [`take_value`](Self::take_value), trying each alias in turn.
    pub fn take_value_any(&mut self, flags: &[&str]) -> Option<String> {
        flags.iter().find_map(|flag| self.take_value(flag))
    }

    /// Removes every `flag value` pair, returning the values in order.
    pub fn take_values(&mut self, flag: &str) -> Vec<String> {
        let mut values = Vec::new();
        while let Some(value) = self.take_value(flag) {
            values.push(value);
        }
        values
    }

    /// Removes every `-Dkey=value` argument and returns the assignments in order.
    /// `-Dkey` without `=` assigns an empty value.
    pub fn take_properties(&mut self) -> IndexMap<String, String> {
        let mut properties = IndexMap::new();
        self.args.retain(|arg| {
            let Some(assignment) = arg.strip_prefix(PROPERTY_PREFIX) else {
                return true;
            };
            let (key, value) = assignment.split_once('=').unwrap_or((assignment, ""));
            properties.insert(key.to_string(), value.to_string());
            false
        });
        properties
    }

    /// Removes and returns the first remaining argument.
    pub fn take_first(&mut self) -> Option<String> {
        if self.args.is_empty() {
            None
        } else {
            Some(self.args.remove(0))
        }
    }

    pub fn extend(&mut self, args: impl IntoIterator<Item = String>) {
        self.args.extend(args);
    }

    pub fn into_vec(self) -> Vec<String> {
        self.args
    }
}

impl From<Vec<String>> for ArgumentList {
    fn from(args: Vec<String>) -> Self {
        Self::new(args)
    }
}
