use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::crude::DEFAULT_VERSION;
use super::discovery::ModuleCandidate;
use super::module_structure::{maven_identifier, ModuleIdentity, ModuleStructure, StructureRoot};
use crate::core::module::{Module, ModuleType};
use crate::core::tools::ClaritasModuleMetadata;

/// Arbitrary files copied into the game directory, found recursively under
/// `files/`. Each keeps its relative path as install path.
pub struct FileStructure {
    root: StructureRoot,
    memo: OnceCell<Vec<Module>>,
}

impl FileStructure {
    pub const DIR_NAME: &'static str = "files";

    pub fn new(root: StructureRoot) -> Self {
        Self {
            root,
            memo: OnceCell::new(),
        }
    }
}

#[async_trait]
impl ModuleStructure for FileStructure {
    fn root(&self) -> &StructureRoot {
        &self.root
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::File
    }

    fn is_recursive(&self) -> bool {
        true
    }

    async fn identify(
        &self,
        candidate: &ModuleCandidate,
        _metadata: Option<&ClaritasModuleMetadata>,
    ) -> ModuleIdentity {
        // config/forge.cfg → generated.file:config.forge:0.0.0@cfg
        let (stem, extension) = split_extension(&candidate.relative_path);
        ModuleIdentity {
            id: maven_identifier(
                &ModuleType::File.default_group(),
                &stem.replace('/', "."),
                DEFAULT_VERSION,
                extension,
            ),
            name: candidate.file.clone(),
        }
    }

    fn module_path(&self, candidate: &ModuleCandidate) -> Option<String> {
        Some(candidate.relative_path.clone())
    }

    fn memo(&self) -> &OnceCell<Vec<Module>> {
        &self.memo
    }
}

fn split_extension(relative_path: &str) -> (&str, &str) {
    let name_start = relative_path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match relative_path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let idx = name_start + dot;
            (&relative_path[..idx], &relative_path[idx + 1..])
        }
        _ => (relative_path, ""),
    }
}
