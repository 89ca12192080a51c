use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument, Span};

use super::model::{ForgeMeta, ServerId, ServerLayout, ServerManifest, ServerMeta};
use crate::core::config::GeneratorConfig;
use crate::core::downloader::Transport;
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::maven::{ArtifactRepository, LIBRARY_REPOSITORY_PATH};
use crate::core::module::Module;
use crate::core::process::ProcessRunner;
use crate::core::resolver::{select_resolver, select_structure, ResolveContext, StructureSetup};
use crate::core::structure::forgemod::DIR_NAME as FORGE_MODS_DIR;
use crate::core::structure::{
    init_namespaces, FileStructure, LibraryStructure, ModuleStructure, StructureRoot,
};
use crate::core::tools::Toolchain;

/// Creates server layouts and generates their distribution entries.
pub struct ServerManager {
    config: GeneratorConfig,
    repository: ArtifactRepository,
    toolchain: Arc<Toolchain>,
}

impl ServerManager {
    pub fn new(
        config: GeneratorConfig,
        transport: Arc<dyn Transport>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        let repository = ArtifactRepository::new(
            config.library_repository_dir(),
            LIBRARY_REPOSITORY_PATH,
            transport,
        );
        let toolchain = Arc::new(Toolchain::from_config(&config, runner));
        Self {
            config,
            repository,
            toolchain,
        }
    }

    pub fn layout(&self, id: ServerId) -> ServerLayout {
        ServerLayout::new(&self.config.servers_dir(), id)
    }

    /// Create an empty server layout with its `servermeta.json`.
    pub async fn create(&self, id: ServerId, forge_version: Option<String>) -> NebulaResult<ServerLayout> {
        let layout = self.layout(id);
        if tokio::fs::try_exists(&layout.path).await.unwrap_or(false) {
            return Err(NebulaError::ServerExists(layout.id.to_string()));
        }

        init_namespaces(&layout.forge_mods_dir()).await?;
        for dir in [layout.libraries_dir(), layout.files_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| NebulaError::io(&dir, e))?;
        }

        let meta = ServerMeta {
            forge: forge_version.map(|version| ForgeMeta { version }),
            ..Default::default()
        };
        self.save_meta(&layout, &meta).await?;

        info!("Created server {} at {:?}", layout.id, layout.path);
        Ok(layout)
    }

    pub async fn save_meta(&self, layout: &ServerLayout, meta: &ServerMeta) -> NebulaResult<()> {
        let path = layout.meta_path();
        let json = serde_json::to_string_pretty(meta)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| NebulaError::io(&path, e))
    }

    /// A missing `servermeta.json` means defaults.
    pub async fn load_meta(&self, layout: &ServerLayout) -> NebulaResult<ServerMeta> {
        let path = layout.meta_path();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(ServerMeta::default());
        }
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| NebulaError::io(&path, e))?;
        serde_json::from_str(&raw).map_err(|e| NebulaError::MalformedMetadata {
            path,
            reason: e.to_string(),
        })
    }

    /// Resolve the loader and scan every structure of the server, in the
    /// order loader, forge mods, libraries, files.
    pub async fn generate(&self, id: ServerId, cancel: &CancellationToken) -> NebulaResult<ServerManifest> {
        let span = info_span!("generate", server = %id);
        self.generate_in(self.layout(id), cancel)
            .instrument(span)
            .await
    }

    async fn generate_in(&self, layout: ServerLayout, cancel: &CancellationToken) -> NebulaResult<ServerManifest> {
        if !tokio::fs::try_exists(&layout.path).await.unwrap_or(false) {
            return Err(NebulaError::NotFound(format!("server directory {:?}", layout.path)));
        }
        let meta = self.load_meta(&layout).await?;
        let minecraft = layout.id.minecraft_version;
        let span = Span::current();
        let base_url = self.config.base_url();
        let mut modules: Vec<Module> = Vec::new();

        let loader_version = meta.forge.as_ref().map(|f| f.version.trim()).unwrap_or_default();
        if loader_version.is_empty() {
            info!("No Forge version configured, skipping the loader");
        } else {
            let resolver = select_resolver(&minecraft, loader_version)?;
            info!("Resolving Forge {} with {}", loader_version, resolver.name());
            let work_dir = self.config.work_dir();
            let module = resolver
                .resolve(ResolveContext {
                    minecraft_version: &minecraft,
                    loader_version,
                    base_url,
                    repository: &self.repository,
                    toolchain: &self.toolchain,
                    work_dir: &work_dir,
                    span: &span,
                    cancel,
                })
                .await?;
            modules.push(module);
        }

        let root = |name: &str, dir: PathBuf| {
            StructureRoot::new(
                name,
                dir,
                base_url,
                &layout.relative_root(name),
                &meta.untracked_files,
                &span,
            )
        };

        let forge_mods = select_structure(
            &minecraft,
            loader_version,
            StructureSetup {
                root: root(FORGE_MODS_DIR, layout.forge_mods_dir())?,
                minecraft_version: minecraft,
                toolchain: self.toolchain.clone(),
            },
        )?;
        let libraries = LibraryStructure::new(root(LibraryStructure::DIR_NAME, layout.libraries_dir())?);
        let files = FileStructure::new(root(FileStructure::DIR_NAME, layout.files_dir())?);

        let structures: [&dyn ModuleStructure; 3] = [forge_mods.as_ref(), &libraries, &files];
        for structure in structures {
            modules.extend(structure.spec_model(cancel).await?);
        }

        info!("Generated {} top-level module(s)", modules.len());
        Ok(ServerManifest {
            id: layout.id.to_string(),
            minecraft_version: minecraft.to_string(),
            modules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::ModuleType;
    use crate::core::structure::UntrackedFilesOption;
    use crate::core::testing::{md5_hex, FakeRunner, FakeTransport};

    fn manager(dir: &std::path::Path) -> (ServerManager, Arc<FakeRunner>) {
        let config = GeneratorConfig {
            root: dir.to_path_buf(),
            base_url: "https://cdn.example.com/".to_string(),
            ..Default::default()
        };
        let runner = Arc::new(FakeRunner::new(|_| 0));
        let manager = ServerManager::new(config, Arc::new(FakeTransport::default()), runner.clone());
        (manager, runner)
    }

    fn id(raw: &str) -> ServerId {
        ServerId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn create_lays_out_every_structure() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(dir.path());

        let layout = manager
            .create(id("Test-1.12.2"), Some("14.23.5.2847".into()))
            .await
            .unwrap();

        for sub in ["forgemods/required", "forgemods/optionalon", "forgemods/optionaloff", "libraries", "files"] {
            assert!(layout.path.join(sub).is_dir(), "{sub}");
        }
        let meta = manager.load_meta(&layout).await.unwrap();
        assert_eq!(meta.forge.unwrap().version, "14.23.5.2847");

        let err = manager.create(id("Test-1.12.2"), None).await.unwrap_err();
        assert!(matches!(err, NebulaError::ServerExists(_)));
    }

    #[tokio::test]
    async fn generate_concatenates_structures_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, runner) = manager(dir.path());
        let layout = manager.create(id("Test-1.16.5"), None).await.unwrap();

        std::fs::write(layout.forge_mods_dir().join("optionaloff/Extra-2.0.jar"), b"not a zip").unwrap();
        std::fs::write(layout.libraries_dir().join("lib-1.0.jar"), b"lib").unwrap();
        std::fs::create_dir_all(layout.files_dir().join("config")).unwrap();
        std::fs::write(layout.files_dir().join("config/forge.cfg"), b"cfg").unwrap();
        std::fs::write(layout.files_dir().join("options.txt"), b"opts").unwrap();

        manager
            .save_meta(
                &layout,
                &ServerMeta {
                    untracked_files: vec![UntrackedFilesOption {
                        applies_to: vec!["files".into()],
                        patterns: vec!["options.txt".into()],
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let manifest = manager
            .generate(id("Test-1.16.5"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(manifest.id, "Test-1.16.5");
        assert_eq!(manifest.minecraft_version, "1.16.5");
        let types: Vec<_> = manifest.modules.iter().map(|m| m.module_type).collect();
        assert_eq!(
            types,
            vec![ModuleType::ForgeMod, ModuleType::Library, ModuleType::File, ModuleType::File]
        );

        let library = &manifest.modules[1];
        assert_eq!(library.id, "generated.library:lib:1.0@jar");
        assert_eq!(
            library.artifact.url,
            "https://cdn.example.com/servers/Test-1.16.5/libraries/lib-1.0.jar"
        );
        assert_eq!(library.artifact.md5.as_deref(), Some(md5_hex(b"lib").as_str()));

        let cfg = &manifest.modules[2];
        assert_eq!(cfg.artifact.path.as_deref(), Some("config/forge.cfg"));
        let options = &manifest.modules[3];
        assert!(options.artifact.md5.is_none());

        // No analyzer configured, no Forge version: nothing was spawned.
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn generate_requires_an_existing_server() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(dir.path());
        let err = manager
            .generate(id("Missing-1.16.5"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NebulaError::NotFound(_)));
    }

    #[tokio::test]
    async fn unsupported_versions_are_rejected_before_scanning() {
        let dir = tempfile::tempdir().unwrap();
        let (manager, _) = manager(dir.path());
        manager
            .create(id("Old-1.6.4"), Some("9.11.1.1345".into()))
            .await
            .unwrap();
        let err = manager
            .generate(id("Old-1.6.4"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, NebulaError::NoStrategyFound { .. }));
    }
}
