// ─── Jar inspection ───
// Text entries and manifest attributes of jar archives.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use zip::result::ZipError;

use crate::core::error::{NebulaError, NebulaResult};

/// Read a text entry of a jar. `Ok(None)` when the entry does not exist.
pub fn read_entry(path: &Path, name: &str) -> NebulaResult<Option<String>> {
    let file = std::fs::File::open(path).map_err(|e| NebulaError::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| NebulaError::io(path, e))?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Value of a main-section attribute of `META-INF/MANIFEST.MF`.
pub fn manifest_attribute(path: &Path, key: &str) -> NebulaResult<Option<String>> {
    Ok(read_entry(path, "META-INF/MANIFEST.MF")?.and_then(|text| parse_manifest_attribute(&text, key)))
}

/// Continuation lines start with a single space and extend the previous value.
fn parse_manifest_attribute(text: &str, key: &str) -> Option<String> {
    let mut value: Option<String> = None;
    let mut current_key: Option<&str> = None;
    for line in text.lines() {
        if line.is_empty() {
            // End of the main section.
            break;
        }
        if let Some(rest) = line.strip_prefix(' ') {
            if current_key == Some(key) {
                if let Some(v) = &mut value {
                    v.push_str(rest.trim_end());
                }
            }
            continue;
        }

        if let Some((k, v)) = line.split_once(':') {
            current_key = Some(k.trim());
            if k.trim() == key {
                value = Some(v.trim().to_string());
            }
        }
    }
    value.filter(|v| !v.is_empty())
}

/// Guess a mod's maven group from the packages its classes live in.
///
/// Only a package whose last segment equals the mod id counts, and that
/// segment is stripped: classes in `com.example.mymod` give `com.example`
/// for mod `mymod`. Jars that only shade other packages give `None`.
pub fn infer_group(path: &Path, mod_id: &str) -> NebulaResult<Option<String>> {
    let file = std::fs::File::open(path).map_err(|e| NebulaError::io(path, e))?;
    let archive = zip::ZipArchive::new(file)?;

    let mut packages = BTreeSet::new();
    for name in archive.file_names() {
        let Some(class) = name.strip_suffix(".class") else {
            continue;
        };
        if let Some((package, _)) = class.rsplit_once('/') {
            if package.starts_with("META-INF") {
                continue;
            }
            packages.insert(package.replace('/', "."));
        }
    }

    let mod_id = mod_id.to_lowercase();
    let matching = packages
        .iter()
        .filter(|p| p.rsplit('.').next() == Some(mod_id.as_str()))
        .min_by_key(|p| p.len());
    Ok(matching.and_then(|package| package.rsplit_once('.').map(|(group, _)| group.to_string())))
}
