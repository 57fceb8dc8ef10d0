//! Main section of a jar `META-INF/MANIFEST.MF`.

use indexmap::IndexMap;
use std::io::Read;
use zip::ZipArchive;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
pub const MAIN_CLASS: &str = "Main-Class";
pub const AUTOMATIC_MODULE_NAME: &str = "Automatic-Module-Name";

/// Parses the main attributes. Continuation lines start with a single space;
/// the first blank line ends the main section.
pub fn parse_manifest(text: &str) -> IndexMap<String, String> {
    let mut attributes: IndexMap<String, String> = IndexMap::new();
    let mut last_key: Option<String> = None;

    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some(value) = last_key.as_ref().and_then(|key| attributes.get_mut(key)) {
                value.push_str(continuation);
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_string();
            attributes.insert(key.clone(), value.trim_start().to_string());
            last_key = Some(key);
        }
    }

    attributes
}

/// Reads the manifest of an open archive, if there is one.
pub fn read_manifest<R: std::io::Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> zip::result::ZipResult<Option<IndexMap<String, String>>> {
    let mut entry = match archive.by_name(MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(Some(parse_manifest(&text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_continuation() {
        let text = "Manifest-Version: 1.0\r\nMain-Class: net.neoforged.installer.Simple\r\n Installer\r\nAutomatic-Module-Name: a.b\r\n\r\nName: other/\r\nMain-Class: ignored\r\n";
        let attrs = parse_manifest(text);
        assert_eq!(
            attrs.get(MAIN_CLASS).map(String::as_str),
            Some("net.neoforged.installer.SimpleInstaller")
        );
        assert_eq!(attrs.get(AUTOMATIC_MODULE_NAME).map(String::as_str), Some("a.b"));
        assert_eq!(attrs.len(), 3);
    }
}
