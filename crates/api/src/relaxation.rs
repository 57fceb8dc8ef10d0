use crate::error::RequestParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target specifier matching every component without a formal identity.
pub const ALL_UNNAMED: &str = "ALL-UNNAMED";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Deep reflective access at run time (`--add-opens`).
    Open,
    /// Link-time access to public types (`--add-exports`).
    Export,
}

impl Relation {
    pub fn flag(self) -> &'static str {
        match self {
            Relation::Open => "--add-opens",
            Relation::Export => "--add-exports",
        }
    }
}

/// Who a relaxation is granted to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Accessor {
    Named(String),
    /// Any component without identity (class-path code).
    Unnamed,
}

impl Accessor {
    pub fn named(name: impl Into<String>) -> Self {
        Accessor::Named(name.into())
    }
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::Named(name) => f.write_str(name),
            Accessor::Unnamed => f.write_str(ALL_UNNAMED),
        }
    }
}

/// Target list of a request. `ALL-UNNAMED` may appear anywhere in the list,
/// alongside named components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaxTarget {
    /// Named components in list order, without duplicates.
    pub named: Vec<String>,
    pub all_unnamed: bool,
}

impl RelaxTarget {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            named: names.into_iter().map(Into::into).collect(),
            all_unnamed: false,
        }
    }

    pub fn all_unnamed() -> Self {
        Self {
            named: Vec::new(),
            all_unnamed: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && !self.all_unnamed
    }
}

/// One `--add-opens` / `--add-exports` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaxationRequest {
    pub source: String,
    pub package: String,
    pub target: RelaxTarget,
    pub relation: Relation,
}

impl RelaxationRequest {
    /// Parses `<component>/<package>=<target>[,<target>...]`.
    pub fn parse(value: &str, relation: Relation) -> Result<Self, RequestParseError> {
        let malformed = || RequestParseError::Malformed(value.to_string());
        let (lhs, rhs) = value.split_once('=').ok_or_else(malformed)?;
        let (source, package) = lhs.split_once('/').ok_or_else(malformed)?;
        if source.is_empty() || package.is_empty() {
            return Err(malformed());
        }

        let mut target = RelaxTarget::default();
        for name in rhs.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            if name == ALL_UNNAMED {
                target.all_unnamed = true;
            } else if !target.named.iter().any(|n| n == name) {
                target.named.push(name.to_string());
            }
        }
        if target.is_empty() {
            return Err(RequestParseError::EmptyTargets(value.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            package: package.to_string(),
            target,
            relation,
        })
    }
}

impl FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "--add-opens" | "open" => Ok(Relation::Open),
            "--add-exports" | "export" => Ok(Relation::Export),
            other => Err(format!("unknown relation '{other}'")),
        }
    }
}
