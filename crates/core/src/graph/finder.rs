//! Component discovery on a module path.
//!
//! A module path entry is either:
//! - an archive (jar), which is one component
//! - an exploded component: a directory with `module-info.class` at its root
//! - a directory of the above, scanned one level deep

use crate::error::GraphError;
use crate::graph::module_info;
use crate::manifest::{AUTOMATIC_MODULE_NAME, read_manifest};
use bootshim_api::{ComponentDescriptor, ComponentRef, Platform};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;
use zip::ZipArchive;

const MODULE_INFO: &str = "module-info.class";
const ARCHIVE_EXTENSIONS: &[&str] = &["jar", "zip"];

/// Source of components for a graph layer.
pub trait ComponentFinder {
    /// Every component reachable from this finder, in path order.
    fn find_all(&self) -> Result<Vec<ComponentRef>, GraphError>;
}

/// Finds components on an ordered list of filesystem locations.
#[derive(Debug, Clone)]
pub struct PathFinder {
    locations: Vec<PathBuf>,
}

impl PathFinder {
    pub fn new(locations: Vec<PathBuf>) -> Self {
        Self { locations }
    }

    /// Splits a module path argument on the platform separator. Relative
    /// entries are resolved against `base_dir`.
    pub fn from_path_list(list: &str, platform: Platform, base_dir: &Path) -> Self {
        let locations = list
            .split(platform.path_separator())
            .filter(|entry| !entry.is_empty())
            .map(|entry| base_dir.join(entry))
            .collect();
        Self::new(locations)
    }

    pub fn locations(&self) -> &[PathBuf] {
        &self.locations
    }

    fn scan_location(&self, location: &Path) -> Result<Vec<ComponentRef>, GraphError> {
        if location.is_file() {
            return Ok(vec![read_archive(location)?]);
        }
        if !location.is_dir() {
            debug!("Skipping missing module path entry {}", location.display());
            return Ok(Vec::new());
        }
        if location.join(MODULE_INFO).is_file() {
            return Ok(vec![read_exploded(location)?]);
        }

        let mut found: IndexMap<String, ComponentRef> = IndexMap::new();
        for entry in WalkDir::new(location)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| GraphError::Io {
                path: location.to_path_buf(),
                source: e.into(),
            })?;
            let path = entry.path();

            let component = if entry.file_type().is_dir() {
                if !path.join(MODULE_INFO).is_file() {
                    trace!("Ignoring non-component directory {}", path.display());
                    continue;
                }
                read_exploded(path)?
            } else if is_archive(path) {
                read_archive(path)?
            } else {
                continue;
            };

            if let Some(first) = found.get(component.name()) {
                return Err(GraphError::Duplicate {
                    name: component.name().to_string(),
                    first: first.location.clone(),
                    second: component.location,
                });
            }
            found.insert(component.name().to_string(), component);
        }

        Ok(found.into_values().collect())
    }
}

impl ComponentFinder for PathFinder {
    fn find_all(&self) -> Result<Vec<ComponentRef>, GraphError> {
        let mut found: IndexMap<String, ComponentRef> = IndexMap::new();
        for location in &self.locations {
            for component in self.scan_location(location)? {
                if let Some(first) = found.get(component.name()) {
                    debug!(
                        "{} from {} is shadowed by {}",
                        component.name(),
                        component.location.display(),
                        first.location.display()
                    );
                    continue;
                }
                found.insert(component.name().to_string(), component);
            }
        }
        Ok(found.into_values().collect())
    }
}

/// Fixed set of components, mostly for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticFinder {
    components: Vec<ComponentRef>,
}

impl StaticFinder {
    pub fn new(components: Vec<ComponentRef>) -> Self {
        Self { components }
    }
}

impl ComponentFinder for StaticFinder {
    fn find_all(&self) -> Result<Vec<ComponentRef>, GraphError> {
        Ok(self.components.clone())
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ARCHIVE_EXTENSIONS.iter().any(|a| ext.eq_ignore_ascii_case(a)))
}

fn read_archive(path: &Path) -> Result<ComponentRef, GraphError> {
    let archive_err = |source| GraphError::Archive {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(archive_err)?;
    let packages = packages_in_archive(&mut archive).map_err(archive_err)?;

    let module_info = match archive.by_name(MODULE_INFO) {
        Ok(mut entry) => {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).map_err(|source| GraphError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Some(bytes)
        }
        Err(zip::result::ZipError::FileNotFound) => None,
        Err(e) => return Err(archive_err(e)),
    };

    let descriptor = match module_info {
        Some(bytes) => module_info::parse(bytes, packages).map_err(|message| {
            GraphError::Descriptor {
                path: path.to_path_buf(),
                message,
            }
        })?,
        None => {
            let declared = read_manifest(&mut archive)
                .map_err(archive_err)?
                .and_then(|attrs| attrs.get(AUTOMATIC_MODULE_NAME).cloned());
            let name = match declared {
                Some(name) => name,
                None => automatic_name(path).ok_or_else(|| GraphError::Descriptor {
                    path: path.to_path_buf(),
                    message: "unable to derive a component name from the file name".into(),
                })?,
            };
            ComponentDescriptor::automatic(name, packages)
        }
    };

    trace!("Found component {} at {}", descriptor.name, path.display());
    Ok(ComponentRef::new(descriptor, path))
}

fn read_exploded(dir: &Path) -> Result<ComponentRef, GraphError> {
    let info_path = dir.join(MODULE_INFO);
    let bytes = std::fs::read(&info_path).map_err(|source| GraphError::Io {
        path: info_path.clone(),
        source,
    })?;
    let descriptor = module_info::parse(bytes, packages_in_directory(dir)).map_err(|message| {
        GraphError::Descriptor {
            path: info_path,
            message,
        }
    })?;
    Ok(ComponentRef::new(descriptor, dir))
}

fn packages_in_archive(
    archive: &mut ZipArchive<File>,
) -> zip::result::ZipResult<BTreeSet<String>> {
    let mut packages = BTreeSet::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if let Some(package) = package_of_entry(entry.name()) {
            packages.insert(package);
        }
    }
    Ok(packages)
}

fn packages_in_directory(dir: &Path) -> BTreeSet<String> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(dir).ok()?;
            let name = relative.to_string_lossy().replace('\\', "/");
            package_of_entry(&name)
        })
        .collect()
}

/// Package of a `.class` entry, `None` for the unnamed package and metadata.
fn package_of_entry(name: &str) -> Option<String> {
    if !name.ends_with(".class") || name.starts_with("META-INF/") {
        return None;
    }
    let (dir, _) = name.rsplit_once('/')?;
    Some(dir.replace('/', "."))
}

/// Name for an archive without descriptor or `Automatic-Module-Name`,
/// derived from its file name: `foo-bar-1.2.jar` becomes `foo.bar`.
pub fn automatic_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let name = module_info::derive_automatic_name(&stem);
    (!name.is_empty()).then_some(name)
}
