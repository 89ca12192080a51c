use std::fs::Metadata;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::crude::crude_inference;
use super::discovery::ModuleCandidate;
use super::module_structure::{maven_identifier, ModuleIdentity, ModuleStructure, StructureRoot};
use crate::core::module::{Module, ModuleType};
use crate::core::tools::ClaritasModuleMetadata;

/// Plain jars dropped into `libraries/`, identified by file name.
pub struct LibraryStructure {
    root: StructureRoot,
    memo: OnceCell<Vec<Module>>,
}

impl LibraryStructure {
    pub const DIR_NAME: &'static str = "libraries";

    pub fn new(root: StructureRoot) -> Self {
        Self {
            root,
            memo: OnceCell::new(),
        }
    }
}

#[async_trait]
impl ModuleStructure for LibraryStructure {
    fn root(&self) -> &StructureRoot {
        &self.root
    }

    fn module_type(&self) -> ModuleType {
        ModuleType::Library
    }

    fn accepts(&self, file: &str, _path: &Path, _stats: &Metadata) -> bool {
        file.to_lowercase().ends_with(".jar")
    }

    async fn identify(
        &self,
        candidate: &ModuleCandidate,
        _metadata: Option<&ClaritasModuleMetadata>,
    ) -> ModuleIdentity {
        let crude = crude_inference(&candidate.file);
        ModuleIdentity {
            id: maven_identifier(
                &ModuleType::Library.default_group(),
                &crude.name,
                &crude.version,
                ModuleType::Library.default_extension(),
            ),
            name: crude.name,
        }
    }

    fn memo(&self) -> &OnceCell<Vec<Module>> {
        &self.memo
    }
}
