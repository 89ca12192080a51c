// ─── Forge mods ───
// Toggleable `forgemods/` structure. Two metadata formats exist:
//   - legacy (1.7–1.12): `mcmod.info`, a JSON list inside the jar
//   - modern (1.13+):    `META-INF/mods.toml`
// Both reconcile what the jar declares with what Claritas inferred and what
// the file name says, in that order.

pub mod legacy;
pub mod modern;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, warn};

pub use legacy::LegacyForgeModStructure;
pub use modern::ModernForgeModStructure;

use super::crude::{crude_inference, CrudeInference};
use super::discovery::ModuleCandidate;
use super::module_structure::{maven_identifier, EnrichmentRequest, ModuleIdentity, StructureRoot};
use crate::core::error::NebulaError;
use crate::core::jar;
use crate::core::module::{Module, ModuleType};
use crate::core::tools::{ClaritasException, ClaritasModuleMetadata, LibraryType, Toolchain};
use crate::core::version::MinecraftVersion;

pub const DIR_NAME: &str = "forgemods";

/// Placeholder id of the Forge MDK template.
const EXAMPLE_MOD_ID: &str = "examplemod";

/// What a mod's own metadata file declares. Any field may be unusable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclaredMod {
    pub id: Option<String>,
    pub name: Option<String>,
    pub version: Option<String>,
}

/// State shared by both forge mod structures.
pub struct ForgeModBase {
    root: StructureRoot,
    minecraft_version: MinecraftVersion,
    toolchain: Arc<Toolchain>,
    exceptions: Vec<ClaritasException>,
    memo: OnceCell<Vec<Module>>,
}

impl ForgeModBase {
    pub fn new(root: StructureRoot, minecraft_version: MinecraftVersion, toolchain: Arc<Toolchain>) -> Self {
        Self {
            root,
            minecraft_version,
            toolchain,
            exceptions: default_exceptions(),
            memo: OnceCell::new(),
        }
    }

    fn enrichment(&self) -> Option<EnrichmentRequest<'_>> {
        let Some(claritas) = self.toolchain.claritas.as_ref() else {
            debug!("Claritas is not configured, skipping enrichment");
            return None;
        };
        Some(EnrichmentRequest {
            claritas,
            library_type: LibraryType::Forge,
            minecraft_version: &self.minecraft_version,
            exceptions: &self.exceptions,
        })
    }

    /// Build the identity from whatever the jar declared (if it could be read).
    fn identify(
        &self,
        candidate: &ModuleCandidate,
        declared: Option<DeclaredMod>,
        metadata: Option<&ClaritasModuleMetadata>,
    ) -> ModuleIdentity {
        let crude = crude_inference(&candidate.file);
        let resolved = reconcile(declared.as_ref(), metadata, &crude);
        let group = mod_group(metadata, &candidate.file_path, &resolved.id);
        ModuleIdentity {
            id: maven_identifier(
                &group,
                &resolved.id,
                &resolved.version,
                ModuleType::ForgeMod.default_extension(),
            ),
            name: resolved.name,
        }
    }
}

/// Jars known to confuse the analyzer.
fn default_exceptions() -> Vec<ClaritasException> {
    vec![ClaritasException {
        name_fragment: "optifine".to_string(),
        proxy_metadata: ClaritasModuleMetadata {
            group: Some("net.optifine".to_string()),
            ..Default::default()
        },
    }]
}

fn accepts_jar(file: &str) -> bool {
    file.to_lowercase().ends_with(".jar")
}

/// Log a metadata read failure; identification continues without it.
fn log_unreadable(path: &Path, err: &NebulaError) {
    warn!("{}; falling back for {:?}", err, path.file_name().unwrap_or_default());
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedMod {
    id: String,
    name: String,
    version: String,
}

fn usable_id(id: Option<&str>) -> Option<&str> {
    id.map(str::trim)
        .filter(|id| !id.is_empty() && !id.eq_ignore_ascii_case(EXAMPLE_MOD_ID))
}

/// Build-time placeholders (`@VERSION@`, `${version}`) never made it into a
/// release.
fn usable_version(version: Option<&str>) -> Option<&str> {
    version
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.contains('@') && !v.contains("${"))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn reconcile(
    declared: Option<&DeclaredMod>,
    enriched: Option<&ClaritasModuleMetadata>,
    crude: &CrudeInference,
) -> ResolvedMod {
    let declared_id = usable_id(declared.and_then(|d| d.id.as_deref()));
    // A template id means the rest of the declaration is template text too.
    let declared = declared.filter(|_| declared_id.is_some());

    let id = declared_id
        .or_else(|| usable_id(enriched.and_then(|m| m.id.as_deref())))
        .map(str::to_string)
        .unwrap_or_else(|| crude.name.to_lowercase());

    let name = non_empty(declared.and_then(|d| d.name.as_deref()))
        .or_else(|| non_empty(enriched.and_then(|m| m.name.as_deref())))
        .map(str::to_string)
        .unwrap_or_else(|| crude.name.clone());

    let version = usable_version(declared.and_then(|d| d.version.as_deref()))
        .or_else(|| usable_version(enriched.and_then(|m| m.version.as_deref())))
        .map(str::to_string)
        .unwrap_or_else(|| crude.version.clone());

    ResolvedMod { id, name, version }
}

fn mod_group(enriched: Option<&ClaritasModuleMetadata>, path: &Path, mod_id: &str) -> String {
    if let Some(group) = non_empty(enriched.and_then(|m| m.group.as_deref())) {
        return group.to_string();
    }
    match jar::infer_group(path, mod_id) {
        Ok(Some(group)) => group,
        Ok(None) => ModuleType::ForgeMod.default_group(),
        Err(e) => {
            log_unreadable(path, &e);
            ModuleType::ForgeMod.default_group()
        }
    }
}
