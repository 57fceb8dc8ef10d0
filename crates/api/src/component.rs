use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// How a component got its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Declared through a `module-info.class` descriptor.
    Explicit,
    /// Named from the archive manifest or file name; exports and opens everything.
    Automatic,
}

/// A `requires` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub name: String,
    /// `requires static`: only needed at compile time, may be absent at run time.
    pub optional: bool,
}

impl Requirement {
    pub fn mandatory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// An `exports` or `opens` clause. An empty target list means unqualified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageGrant {
    pub package: String,
    pub targets: Vec<String>,
}

impl PackageGrant {
    pub fn unqualified(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            targets: Vec::new(),
        }
    }

    fn covers(&self, package: &str, accessor: &str) -> bool {
        self.package == package
            && (self.targets.is_empty() || self.targets.iter().any(|t| t == accessor))
    }
}

/// Declared shape of a component, before any run-time relaxation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub name: String,
    pub kind: ComponentKind,
    /// `open module`: every package is open for reflection.
    pub open: bool,
    pub requires: Vec<Requirement>,
    pub exports: Vec<PackageGrant>,
    pub opens: Vec<PackageGrant>,
    pub packages: BTreeSet<String>,
}

impl ComponentDescriptor {
    pub fn automatic(name: impl Into<String>, packages: BTreeSet<String>) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Automatic,
            open: true,
            requires: Vec::new(),
            exports: Vec::new(),
            opens: Vec::new(),
            packages,
        }
    }

    pub fn contains_package(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    /// Whether `package` is exported to the component named `accessor` by declaration.
    pub fn exports_to(&self, package: &str, accessor: &str) -> bool {
        match self.kind {
            ComponentKind::Automatic => self.contains_package(package),
            ComponentKind::Explicit => self.exports.iter().any(|g| g.covers(package, accessor)),
        }
    }

    /// Whether `package` is exported without qualification.
    pub fn exports_unqualified(&self, package: &str) -> bool {
        match self.kind {
            ComponentKind::Automatic => self.contains_package(package),
            ComponentKind::Explicit => self
                .exports
                .iter()
                .any(|g| g.package == package && g.targets.is_empty()),
        }
    }

    /// Whether `package` is open to the component named `accessor` by declaration.
    pub fn opens_to(&self, package: &str, accessor: &str) -> bool {
        if self.open {
            return self.contains_package(package);
        }
        self.opens.iter().any(|g| g.covers(package, accessor))
    }

    pub fn opens_unqualified(&self, package: &str) -> bool {
        if self.open {
            return self.contains_package(package);
        }
        self.opens
            .iter()
            .any(|g| g.package == package && g.targets.is_empty())
    }
}

/// A discovered component together with the archive or directory it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub descriptor: ComponentDescriptor,
    pub location: PathBuf,
}

impl ComponentRef {
    pub fn new(descriptor: ComponentDescriptor, location: impl Into<PathBuf>) -> Self {
        Self {
            descriptor,
            location: location.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}
