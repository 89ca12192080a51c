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

const MCMOD_INFO: &str = "mcmod.info";

/// Forge mods for 1.7 through 1.12, described by `mcmod.info`.
pub struct LegacyForgeModStructure {
    base: ForgeModBase,
}

impl LegacyForgeModStructure {
    pub fn new(root: StructureRoot, minecraft_version: MinecraftVersion, toolchain: Arc<Toolchain>) -> Self {
        Self {
            base: ForgeModBase::new(root, minecraft_version, toolchain),
        }
    }
}

/// `mcmod.info` comes in two shapes: a bare list, or version 2's
/// `{ "modListVersion": 2, "modList": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum McModInfoFile {
    List(Vec<McModInfo>),
    Wrapped {
        #[serde(rename = "modList")]
        mod_list: Vec<McModInfo>,
    },
}

#[derive(Debug, Deserialize)]
struct McModInfo {
    #[serde(default)]
    modid: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// First mod declared by the jar. `Ok(None)` when the jar has no
/// `mcmod.info` or it lists nothing.
fn read_mcmod_info(path: &Path) -> NebulaResult<Option<DeclaredMod>> {
    let Some(raw) = jar::read_entry(path, MCMOD_INFO)? else {
        return Ok(None);
    };
    let parsed: McModInfoFile =
        serde_json::from_str(raw.trim_start_matches('\u{feff}')).map_err(|e| {
            NebulaError::MalformedMetadata {
                path: path.to_path_buf(),
                reason: format!("{MCMOD_INFO}: {e}"),
            }
        })?;

    let mods = match parsed {
        McModInfoFile::List(mods) => mods,
        McModInfoFile::Wrapped { mod_list } => mod_list,
    };
    Ok(mods.into_iter().next().map(|info| DeclaredMod {
        id: info.modid,
        name: info.name,
        version: info.version,
    }))
}

#[async_trait]
impl ModuleStructure for LegacyForgeModStructure {
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
        let declared = match read_mcmod_info(&candidate.file_path) {
            Ok(Some(declared)) => Some(declared),
            Ok(None) => {
                debug!("{} has no {}", candidate.file, MCMOD_INFO);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GeneratorConfig;
    use crate::core::testing::{write_jar, CapturedLogs, FakeRunner};
    use std::path::PathBuf;
    use tokio_util::sync::CancellationToken;
    use tracing::Span;

    fn toolchain(dir: &Path, runner: Arc<FakeRunner>, claritas: Option<PathBuf>) -> Arc<Toolchain> {
        let config = GeneratorConfig {
            root: dir.to_path_buf(),
            claritas_jar: claritas,
            ..Default::default()
        };
        Arc::new(Toolchain::from_config(&config, runner))
    }

    fn structure(dir: &Path, toolchain: Arc<Toolchain>) -> LegacyForgeModStructure {
        let root = StructureRoot::new(
            "forgemods",
            dir.join("forgemods"),
            "http://localhost:8080",
            "servers/Test-1.12.2/forgemods",
            &[],
            &Span::none(),
        )
        .unwrap();
        LegacyForgeModStructure::new(root, MinecraftVersion::parse("1.12.2").unwrap(), toolchain)
    }

    #[test]
    fn both_mcmod_info_shapes_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.jar");
        write_jar(
            &list,
            &[(MCMOD_INFO, br#"[{"modid":"jei","name":"JEI","version":"4.16"}]"#)],
        );
        let wrapped = dir.path().join("wrapped.jar");
        write_jar(
            &wrapped,
            &[(MCMOD_INFO, br#"{"modListVersion":2,"modList":[{"modid":"baubles"}]}"#)],
        );

        assert_eq!(read_mcmod_info(&list).unwrap().unwrap().id.as_deref(), Some("jei"));
        assert_eq!(
            read_mcmod_info(&wrapped).unwrap().unwrap().id.as_deref(),
            Some("baubles")
        );
    }

    #[test]
    fn unparsable_info_is_malformed_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("bad.jar");
        write_jar(&jar, &[(MCMOD_INFO, b"[{ modid: broken ")]);
        assert!(matches!(
            read_mcmod_info(&jar),
            Err(NebulaError::MalformedMetadata { .. })
        ));
    }

    #[tokio::test]
    async fn namespaces_and_declared_metadata_shape_the_modules() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join("forgemods");
        write_jar(
            &mods.join("required/ExampleMod-1.0.0.jar"),
            &[(MCMOD_INFO, br#"[{"modid":"example","name":"Example","version":"1.0.0"}]"#)],
        );
        write_jar(&mods.join("optionalon/Extra-2.0.jar"), &[("a/b/extra/X.class", b"")]);
        write_jar(&mods.join("optionaloff/Off-3.1.jar"), &[]);

        let runner = Arc::new(FakeRunner::new(|_| 0));
        let modules = structure(dir.path(), toolchain(dir.path(), runner.clone(), None))
            .spec_model(&CancellationToken::new())
            .await
            .unwrap();

        assert!(runner.calls().is_empty());
        assert_eq!(modules.len(), 3);

        let example = &modules[0];
        assert_eq!(example.id, "generated.forgemod:example:1.0.0@jar");
        assert_eq!(example.name, "Example");
        assert_eq!(example.module_type, ModuleType::ForgeMod);
        assert!(example.required.is_none());
        assert_eq!(
            example.artifact.url,
            "http://localhost:8080/servers/Test-1.12.2/forgemods/required/ExampleMod-1.0.0.jar"
        );

        let extra = &modules[1];
        assert_eq!(extra.id, "a.b:extra:2.0@jar");
        assert_eq!(extra.required.unwrap().value, Some(false));
        assert_eq!(extra.required.unwrap().def, None);

        let off = &modules[2];
        assert_eq!(off.id, "generated.forgemod:off:3.1@jar");
        assert_eq!(off.required.unwrap().def, Some(false));
    }

    #[tokio::test]
    async fn failed_enrichment_falls_back_for_the_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join("forgemods");
        write_jar(&mods.join("required/Alpha-1.0.jar"), &[]);
        write_jar(&mods.join("required/Beta-2.0.jar"), &[(MCMOD_INFO, b"not json")]);

        let runner = Arc::new(FakeRunner::new(|_| 1));
        let modules = structure(
            dir.path(),
            toolchain(dir.path(), runner.clone(), Some(PathBuf::from("/opt/claritas.jar"))),
        )
        .spec_model(&CancellationToken::new())
        .await
        .unwrap();

        assert_eq!(runner.calls().len(), 1);
        let ids: Vec<_> = modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "generated.forgemod:alpha:1.0@jar",
                "generated.forgemod:beta:2.0@jar"
            ]
        );
    }

    #[tokio::test]
    async fn files_missing_from_the_analysis_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join("forgemods");
        let known = mods.join("required/Known.jar");
        write_jar(&known, &[]);
        write_jar(&mods.join("required/Unknown-Mod-2.1.jar"), &[]);

        let work = dir.path().join("work");
        let output = work.join("claritas").join("claritas-output.json");
        let key = known.to_string_lossy().to_string();
        let runner = Arc::new(FakeRunner::new(move |_| {
            let body = serde_json::json!({ &key: { "id": "known", "version": "1.0" } });
            std::fs::write(&output, body.to_string()).unwrap();
            0
        }));
        let config = GeneratorConfig {
            claritas_jar: Some(PathBuf::from("/opt/claritas.jar")),
            work_dir: Some(work),
            ..Default::default()
        };
        let toolchain = Arc::new(Toolchain::from_config(&config, runner));

        let logs = CapturedLogs::default();
        let _guard = logs.install();
        let modules = structure(dir.path(), toolchain)
            .spec_model(&CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<_> = modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "generated.forgemod:known:1.0@jar",
                "generated.forgemod:unknown-mod:2.1@jar"
            ]
        );
        let logs = logs.contents();
        assert!(logs.contains("Claritas returned no metadata for Unknown-Mod-2.1.jar"), "{logs}");
        assert!(!logs.contains("no metadata for Known.jar"), "{logs}");
    }

    #[tokio::test]
    async fn enrichment_fills_gaps_and_exceptions_skip_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join("forgemods");
        let plain = mods.join("required/Plain.jar");
        write_jar(&plain, &[]);
        write_jar(&mods.join("optionalon/OptiFine_1.12.2_HD_U_G5.jar"), &[]);

        let work = dir.path().join("work");
        let output = work.join("claritas").join("claritas-output.json");
        let key = plain.to_string_lossy().to_string();
        let runner = Arc::new(FakeRunner::new(move |spec| {
            let args = std::fs::read_to_string(spec.args[2].trim_start_matches('@')).unwrap();
            assert!(!args.contains("OptiFine"));
            let body = serde_json::json!({
                &key: { "id": "plain", "group": "org.plain", "version": "5.0" }
            });
            std::fs::write(&output, body.to_string()).unwrap();
            0
        }));
        let config = GeneratorConfig {
            claritas_jar: Some(PathBuf::from("/opt/claritas.jar")),
            work_dir: Some(work.clone()),
            ..Default::default()
        };
        let toolchain = Arc::new(Toolchain::from_config(&config, runner.clone()));

        let structure = structure(dir.path(), toolchain);
        let modules = structure.spec_model(&CancellationToken::new()).await.unwrap();

        let ids: Vec<_> = modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "org.plain:plain:5.0@jar",
                "net.optifine:optifine_1.12.2_hd_u_g5:0.0.0@jar"
            ]
        );

        // Memoized: a second call neither rescans nor reruns the analyzer.
        structure.spec_model(&CancellationToken::new()).await.unwrap();
        assert_eq!(runner.calls().len(), 1);
    }
}
