//! Component descriptors from `module-info.class` and automatic naming.

use bootshim_api::{ComponentDescriptor, ComponentKind, PackageGrant, Requirement};
use once_cell::sync::Lazy;
use regex::Regex;
use ristretto_classfile::attributes::Attribute;
use ristretto_classfile::{ClassFile, Constant, ConstantPool};
use std::collections::BTreeSet;
use std::io::Cursor;

const ACC_OPEN: u16 = 0x0020;
const ACC_STATIC_PHASE: u16 = 0x0040;

static VERSION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+(\.|$))").unwrap());
static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").unwrap());
static REPEATED_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

/// Builds a descriptor from the bytes of a `module-info.class`.
///
/// `packages` are the packages found in the component's content; packages
/// named only in the descriptor are added to them.
pub fn parse(bytes: Vec<u8>, mut packages: BTreeSet<String>) -> Result<ComponentDescriptor, String> {
    let class = ClassFile::from_bytes(&mut Cursor::new(bytes))
        .map_err(|e| format!("Failed to parse module-info: {e:?}"))?;
    let pool = &class.constant_pool;

    let (module_name_index, flags, requires, exports, opens) = class
        .attributes
        .iter()
        .find_map(|attribute| match attribute {
            Attribute::Module {
                module_name_index,
                flags,
                requires,
                exports,
                opens,
                ..
            } => Some((*module_name_index, flags.bits(), requires, exports, opens)),
            _ => None,
        })
        .ok_or_else(|| "module-info has no Module attribute".to_string())?;

    let name = module_name(pool, module_name_index)?;

    let requires = requires
        .iter()
        .map(|r| {
            let target = module_name(pool, r.index)?;
            Ok(if r.flags.bits() & ACC_STATIC_PHASE != 0 {
                Requirement::optional(target)
            } else {
                Requirement::mandatory(target)
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    let exports = exports
        .iter()
        .map(|e| grant(pool, e.index, &e.to_index))
        .collect::<Result<Vec<_>, String>>()?;
    let opens = opens
        .iter()
        .map(|o| grant(pool, o.index, &o.to_index))
        .collect::<Result<Vec<_>, String>>()?;

    packages.extend(exports.iter().map(|g| g.package.clone()));
    packages.extend(opens.iter().map(|g| g.package.clone()));

    Ok(ComponentDescriptor {
        name,
        kind: ComponentKind::Explicit,
        open: flags & ACC_OPEN != 0,
        requires,
        exports,
        opens,
        packages,
    })
}

fn grant(pool: &ConstantPool, package_index: u16, targets: &[u16]) -> Result<PackageGrant, String> {
    Ok(PackageGrant {
        package: package_name(pool, package_index)?,
        targets: targets
            .iter()
            .map(|&index| module_name(pool, index))
            .collect::<Result<Vec<_>, String>>()?,
    })
}

fn utf8(pool: &ConstantPool, index: u16) -> Result<String, String> {
    match pool.get(index) {
        Some(Constant::Utf8(value)) => Ok(value.to_string()),
        other => Err(format!("constant #{index} is not UTF-8: {other:?}")),
    }
}

fn module_name(pool: &ConstantPool, index: u16) -> Result<String, String> {
    match pool.get(index) {
        Some(Constant::Module(name_index)) => utf8(pool, *name_index),
        other => Err(format!("constant #{index} is not a module: {other:?}")),
    }
}

fn package_name(pool: &ConstantPool, index: u16) -> Result<String, String> {
    match pool.get(index) {
        Some(Constant::Package(name_index)) => Ok(utf8(pool, *name_index)?.replace('/', ".")),
        other => Err(format!("constant #{index} is not a package: {other:?}")),
    }
}

/// Derives an automatic component name from a file stem: the version suffix
/// is cut, every non-alphanumeric character becomes a dot, runs of dots
/// collapse and leading/trailing dots are trimmed.
pub fn derive_automatic_name(stem: &str) -> String {
    let unversioned = match VERSION_SUFFIX.find(stem) {
        Some(m) => &stem[..m.start()],
        None => stem,
    };
    let dotted = NON_ALPHANUMERIC.replace_all(unversioned, ".");
    let collapsed = REPEATED_DOTS.replace_all(&dotted, ".");
    collapsed.trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_automatic_name() {
        assert_eq!(derive_automatic_name("securejarhandler-2.1.27"), "securejarhandler");
        assert_eq!(derive_automatic_name("asm-commons-9.7"), "asm.commons");
        assert_eq!(derive_automatic_name("jopt-simple-5.0.4"), "jopt.simple");
        assert_eq!(derive_automatic_name("foo_bar..baz"), "foo.bar.baz");
        assert_eq!(derive_automatic_name("lib-1"), "lib");
        assert_eq!(derive_automatic_name("lib-v2"), "lib.v2");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse(vec![0, 1, 2, 3], BTreeSet::new()).is_err());
    }
}
