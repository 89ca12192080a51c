use std::fs::Metadata;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{accepts_jar, log_unreadable, DeclaredMod, ForgeModBase};
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::jar;
use crate::core::module::{Module, ModuleType};
use crate::core::structure::discovery::ModuleCandidate;
use crate::core::structure::module_structure::{
    EnrichmentRequest, ModuleIdentity, ModuleStructure, StructureRoot,
};
use crate::core::tools::{ClaritasModuleMetadata, Toolchain};
use crate::core::version::MinecraftVersion;

const MODS_TOML: &str = "META-INF/mods.toml";
/// Replaced by the jar's `Implementation-Version` at load time.
const JAR_VERSION_PLACEHOLDER: &str = "${file.jarVersion}";

/// Forge mods for 1.13 and later, described by `META-INF/mods.toml`.
pub struct ModernForgeModStructure {
    base: ForgeModBase,
}

impl ModernForgeModStructure {
    pub fn new(root: StructureRoot, minecraft_version: MinecraftVersion, toolchain: Arc<Toolchain>) -> Self {
        Self {
            base: ForgeModBase::new(root, minecraft_version, toolchain),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModsToml {
    #[serde(default)]
    mods: Vec<ModsTomlEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModsTomlEntry {
    #[serde(default)]
    mod_id: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

fn read_mods_toml(path: &Path) -> NebulaResult<Option<DeclaredMod>> {
    let Some(raw) = jar::read_entry(path, MODS_TOML)? else {
        return Ok(None);
    };
    let parsed: ModsToml = toml::from_str(&raw).map_err(|e| NebulaError::MalformedMetadata {
        path: path.to_path_buf(),
        reason: format!("{MODS_TOML}: {e}"),
    })?;

    let Some(entry) = parsed.mods.into_iter().next() else {
        return Ok(None);
    };
    let version = match entry.version {
        Some(v) if v.trim() == JAR_VERSION_PLACEHOLDER => {
            jar::manifest_attribute(path, "Implementation-Version")?
        }
        other => other,
    };
    Ok(Some(DeclaredMod {
        id: entry.mod_id,
        name: entry.display_name,
        version,
    }))
}

#[async_trait]
impl ModuleStructure for ModernForgeModStructure {
    fn root(&self) -> &StructureRoot {
        &self.base.root
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::ForgeMod
    }

    fn is_toggleable(&self) -> bool {
        true
    }

    fn accepts(&self, file: &str, _path: &Path, _stats: &Metadata) -> bool {
        accepts_jar(file)
    }

    fn enrichment(&self) -> Option<EnrichmentRequest<'_>> {
        self.base.enrichment()
    }

    async fn identify(
        &self,
        candidate: &ModuleCandidate,
        metadata: Option<&ClaritasModuleMetadata>,
    ) -> ModuleIdentity {
        let declared = match read_mods_toml(&candidate.file_path) {
            Ok(Some(declared)) => Some(declared),
            Ok(None) => {
                debug!("{} declares no mods in {}", candidate.file, MODS_TOML);
                None
            }
            Err(e) => {
                log_unreadable(&candidate.file_path, &e);
                None
            }
        };
        self.base.identify(candidate, declared, metadata)
    }

    fn memo(&self) -> &OnceCell<Vec<Module>> {
        &self.base.memo
    }
}
