use std::sync::OnceLock;

use regex::Regex;

pub const DEFAULT_VERSION: &str = "0.0.0";

/// Name and version guessed from a file name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudeInference {
    pub name: String,
    pub version: String,
}

fn jar_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // The version starts at the first dash followed by a digit:
    // `kotlin-stdlib-1.9.0` and `Baubles-1.12-1.5.2` both split as expected.
    PATTERN.get_or_init(|| Regex::new(r"^(.+?)-(\d.*)\.[jJ][aA][rR]$").unwrap())
}

/// `Name-1.2.3.jar` → (`Name`, `1.2.3`). Anything else keeps its stem and
/// gets [`DEFAULT_VERSION`].
pub fn crude_inference(file_name: &str) -> CrudeInference {
    if let Some(caps) = jar_name_pattern().captures(file_name) {
        return CrudeInference {
            name: caps[1].to_string(),
            version: caps[2].to_string(),
        };
    }

    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    CrudeInference {
        name: stem.to_string(),
        version: DEFAULT_VERSION.to_string(),
    }
}
