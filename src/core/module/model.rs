use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a distribution module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ModuleType {
    Library,
    /// Forge jar hosted by the distribution itself.
    ForgeHosted,
    /// Forge jar the launcher fetches on its own.
    Forge,
    ForgeMod,
    File,
    VersionManifest,
}

impl ModuleType {
    /// Extension appended to generated maven identifiers.
    pub fn default_extension(&self) -> &'static str {
        match self {
            ModuleType::Library
            | ModuleType::ForgeHosted
            | ModuleType::Forge
            | ModuleType::ForgeMod => "jar",
            ModuleType::VersionManifest => "json",
            ModuleType::File => "",
        }
    }

    /// Group used when nothing better is known, `generated.<type>`.
    pub fn default_group(&self) -> String {
        format!("generated.{}", self.to_string().to_lowercase())
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModuleType::Library => "Library",
            ModuleType::ForgeHosted => "ForgeHosted",
            ModuleType::Forge => "Forge",
            ModuleType::ForgeMod => "ForgeMod",
            ModuleType::File => "File",
            ModuleType::VersionManifest => "VersionManifest",
        };
        f.write_str(name)
    }
}

/// Optional override of a module's required state.
///
/// `value: false` makes the module optional, `def` is its default toggle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Required {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def: Option<bool>,
}

/// Downloadable payload of a module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artifact {
    pub size: u64,
    #[serde(rename = "MD5", default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    pub url: String,
    /// Only present when the storage path cannot be derived from the id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A node of the distribution manifest.
///
/// ```json
/// { "id": "generated.forgemod:example:1.0.0@jar", "name": "Example",
///   "type": "ForgeMod", "artifact": { "size": 1, "MD5": "..", "url": ".." } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub module_type: ModuleType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Required>,
    pub artifact: Artifact,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_modules: Vec<Module>,
}

impl Module {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        module_type: ModuleType,
        artifact: Artifact,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            module_type,
            required: None,
            artifact,
            sub_modules: Vec::new(),
        }
    }

    /// Depth-first search over this module and its descendants.
    pub fn find_mut(&mut self, id: &str) -> Option<&mut Module> {
        if self.id == id {
            return Some(self);
        }
        self.sub_modules.iter_mut().find_map(|m| m.find_mut(id))
    }
}
