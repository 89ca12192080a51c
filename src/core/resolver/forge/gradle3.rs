// ─── ForgeGradle 3 ───
// Forge 1.12.2 (after 14.23.5.2847) and 1.13+. Libraries are produced by
// running the official installer in a scratch directory, then harvested from
// what it wrote.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, info_span, Instrument};

use super::{
    forge_artifact, hosted_module, library_display_name, recreate_dir, remove_dir_quietly,
    FORGE_ARTIFACT, FORGE_GROUP,
};
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::jar;
use crate::core::maven::{MavenArtifact, FORGE_MAVEN};
use crate::core::module::{Module, ModuleType};
use crate::core::process::{run_checked, ProcessSpec};
use crate::core::resolver::{LoaderResolver, ResolveContext};
use crate::core::version::{forge_artifact_version, forge_version_manifest_id, MinecraftVersion};

const INSTALL_PROFILE: &str = "install_profile.json";
const MINECRAFT_GROUP: &str = "net.minecraft";
const MINECRAFT_CLIENT: &str = "client";

/// Subset of the version manifest the installer writes under `versions/`.
#[derive(Debug, Deserialize)]
struct InstalledVersion {
    #[serde(default)]
    libraries: Vec<InstalledLibrary>,
    #[serde(default)]
    arguments: Option<InstalledArguments>,
}

#[derive(Debug, Deserialize)]
struct InstalledLibrary {
    name: String,
    #[serde(default)]
    downloads: Option<LibraryDownloads>,
}

#[derive(Debug, Deserialize)]
struct LibraryDownloads {
    #[serde(default)]
    artifact: Option<DownloadArtifact>,
}

#[derive(Debug, Deserialize)]
struct DownloadArtifact {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InstalledArguments {
    #[serde(default)]
    game: Vec<serde_json::Value>,
}

/// A file the installer generates rather than downloads. Classifiers are
/// tried in order; the first existing one wins.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GeneratedArtifact {
    label: &'static str,
    artifact: MavenArtifact,
    classifiers: &'static [&'static str],
    required: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForgeGradle3Resolver;

#[async_trait]
impl LoaderResolver for ForgeGradle3Resolver {
    async fn resolve(&self, ctx: ResolveContext<'_>) -> NebulaResult<Module> {
        let span = info_span!(
            parent: ctx.span,
            "forge_gradle3",
            minecraft = %ctx.minecraft_version,
            forge = ctx.loader_version
        );
        resolve_installer(&ctx).instrument(span).await
    }
}

async fn resolve_installer(ctx: &ResolveContext<'_>) -> NebulaResult<Module> {
    let installer = forge_artifact(
        ctx.minecraft_version,
        ctx.loader_version,
        Some("installer"),
        "jar",
    );
    info!("Resolving {}", installer);
    let installer_path = ctx
        .repository
        .ensure_artifact(FORGE_MAVEN, &installer, ctx.cancel)
        .await?;

    let work = ctx.work_dir.join("forge-installer");
    recreate_dir(&work).await?;
    let result = install_and_harvest(ctx, &installer, &installer_path, &work).await;
    remove_dir_quietly(&work).await;
    result
}

async fn install_and_harvest(
    ctx: &ResolveContext<'_>,
    installer: &MavenArtifact,
    installer_path: &Path,
    work: &Path,
) -> NebulaResult<Module> {
    run_installer(ctx, installer_path, work).await?;

    let manifest_id = forge_version_manifest_id(ctx.minecraft_version, ctx.loader_version);
    let manifest_path = work
        .join("versions")
        .join(&manifest_id)
        .join(format!("{manifest_id}.json"));
    if !tokio::fs::try_exists(&manifest_path).await.unwrap_or(false) {
        return Err(NebulaError::NotFound(format!(
            "version manifest {}",
            manifest_path.display()
        )));
    }
    let raw = tokio::fs::read_to_string(&manifest_path)
        .await
        .map_err(|e| NebulaError::io(&manifest_path, e))?;
    let manifest: InstalledVersion =
        serde_json::from_str(&raw).map_err(|e| NebulaError::MalformedMetadata {
            path: manifest_path.clone(),
            reason: e.to_string(),
        })?;

    let mut forge_module = hosted_module(
        ctx.repository,
        ctx.base_url,
        installer,
        installer_path,
        "Minecraft Forge".to_string(),
        ModuleType::ForgeHosted,
    )
    .await?;

    let manifest_artifact = forge_artifact(ctx.minecraft_version, ctx.loader_version, None, "json");
    let stored = ctx
        .repository
        .install_file(&manifest_path, &manifest_artifact)
        .await?;
    forge_module.sub_modules.push(
        hosted_module(
            ctx.repository,
            ctx.base_url,
            &manifest_artifact,
            &stored,
            "Minecraft Forge (version.json)".to_string(),
            ModuleType::VersionManifest,
        )
        .await?,
    );

    let libraries_dir = work.join("libraries");
    let mut seen: HashSet<String> = HashSet::new();

    let mcp_version = if ctx.minecraft_version.minor() >= 13 {
        Some(mcp_version(installer_path, &manifest)?)
    } else {
        None
    };
    for generated in generated_plan(ctx.minecraft_version, ctx.loader_version, mcp_version.as_deref()) {
        let Some((artifact, located)) = locate_generated(&libraries_dir, &generated).await else {
            if generated.required {
                return Err(NebulaError::NotFound(format!(
                    "generated {} ({} with classifier {:?})",
                    generated.label, generated.artifact, generated.classifiers
                )));
            }
            debug!("Optional {} was not generated, skipping", generated.label);
            continue;
        };
        let module = harvest(ctx, &artifact, &located).await?;
        seen.insert(module.id.clone());
        forge_module.sub_modules.push(module);
    }

    for library in &manifest.libraries {
        if ctx.cancel.is_cancelled() {
            return Err(NebulaError::Cancelled);
        }
        let artifact = MavenArtifact::parse(&library.name)?;
        if seen.contains(&artifact.to_string()) {
            debug!("{} already harvested", artifact);
            continue;
        }
        let relative = library
            .downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.clone())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| artifact.path_string());
        let located = libraries_dir.join(relative);
        if !tokio::fs::try_exists(&located).await.unwrap_or(false) {
            return Err(NebulaError::NotFound(format!(
                "library {} at {}",
                library.name,
                located.display()
            )));
        }
        let module = harvest(ctx, &artifact, &located).await?;
        seen.insert(module.id.clone());
        forge_module.sub_modules.push(module);
    }

    info!(
        "Resolved Forge with {} sub-modules",
        forge_module.sub_modules.len()
    );
    Ok(forge_module)
}

/// Installer run in `work`, which must already be empty.
async fn run_installer(ctx: &ResolveContext<'_>, installer_path: &Path, work: &Path) -> NebulaResult<()> {
    // The installer refuses to run without a launcher profile store.
    let profiles = work.join("launcher_profiles.json");
    tokio::fs::write(&profiles, br#"{"profiles":{}}"#)
        .await
        .map_err(|e| NebulaError::io(&profiles, e))?;

    let file_name = installer_path.file_name().ok_or_else(|| {
        NebulaError::Other(format!("{} has no file name", installer_path.display()))
    })?;
    let working_installer = work.join(file_name);
    tokio::fs::copy(installer_path, &working_installer)
        .await
        .map_err(|e| NebulaError::io(installer_path, e))?;

    let args = if ctx.toolchain.headless_installer {
        vec!["--installClient".to_string(), ".".to_string()]
    } else {
        info!(
            "Choose \"Install client\" and set the directory to {} when the installer opens",
            work.display()
        );
        Vec::new()
    };
    let spec = ProcessSpec::java_jar(
        "Forge installer",
        &ctx.toolchain.java,
        &working_installer,
        args,
    )
    .in_dir(work);
    run_checked(ctx.toolchain.runner.as_ref(), &spec, ctx.cancel).await
}

/// Files the installer generates for this version, in harvest order.
fn generated_plan(
    minecraft: &MinecraftVersion,
    forge_version: &str,
    mcp_version: Option<&str>,
) -> Vec<GeneratedArtifact> {
    let forge = MavenArtifact::new(
        FORGE_GROUP,
        FORGE_ARTIFACT,
        forge_artifact_version(minecraft, forge_version),
        None,
        "jar",
    );
    let Some(mcp) = mcp_version else {
        return vec![GeneratedArtifact {
            label: "universal jar",
            artifact: forge,
            classifiers: &["universal", ""],
            required: true,
        }];
    };

    let client = MavenArtifact::new(
        MINECRAFT_GROUP,
        MINECRAFT_CLIENT,
        format!("{minecraft}-{mcp}"),
        None,
        "jar",
    );
    let entry = |label: &'static str,
                 artifact: &MavenArtifact,
                 classifiers: &'static [&'static str],
                 required: bool| GeneratedArtifact {
        label,
        artifact: artifact.clone(),
        classifiers,
        required,
    };
    vec![
        entry("universal jar", &forge, &["universal"], true),
        entry("client jar", &forge, &["client"], true),
        entry("client srg", &client, &["srg"], false),
        entry("client extra", &client, &["extra", "extra-stable"], true),
        entry("client slim", &client, &["slim", "slim-stable"], false),
        entry("client data", &client, &["data"], false),
    ]
}

async fn locate_generated(
    libraries_dir: &Path,
    generated: &GeneratedArtifact,
) -> Option<(MavenArtifact, PathBuf)> {
    for classifier in generated.classifiers {
        let candidate = generated.artifact.with_classifier(classifier);
        let path = libraries_dir.join(candidate.local_path());
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some((candidate, path));
        }
    }
    None
}

/// Move an installer output into the repository and describe it.
async fn harvest(ctx: &ResolveContext<'_>, artifact: &MavenArtifact, located: &Path) -> NebulaResult<Module> {
    let stored = ctx.repository.install_file(located, artifact).await?;
    hosted_module(
        ctx.repository,
        ctx.base_url,
        artifact,
        &stored,
        library_display_name(artifact),
        ModuleType::Library,
    )
    .await
}

/// MCP version of this Forge build: `data.MCP_VERSION.client` of the
/// installer profile, else the `--fml.mcpVersion` game argument.
fn mcp_version(installer_path: &Path, manifest: &InstalledVersion) -> NebulaResult<String> {
    if let Some(raw) = jar::read_entry(installer_path, INSTALL_PROFILE)? {
        let profile: serde_json::Value = serde_json::from_str(&raw)?;
        if let Some(value) = profile
            .pointer("/data/MCP_VERSION/client")
            .and_then(|v| v.as_str())
        {
            return Ok(value.trim_matches('\'').to_string());
        }
    }

    let game = manifest
        .arguments
        .as_ref()
        .map(|a| a.game.as_slice())
        .unwrap_or_default();
    game.iter()
        .position(|v| v.as_str() == Some("--fml.mcpVersion"))
        .and_then(|i| game.get(i + 1))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| NebulaError::NotFound("MCP version of the Forge installer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{md5_hex, write_jar, FakeRunner, ResolverFixture};
    use serde_json::json;

    const MC: &str = "1.16.5";
    const FORGE: &str = "36.2.39";
    const MCP: &str = "20210115.111550";

    fn mc() -> MinecraftVersion {
        MinecraftVersion::parse(MC).unwrap()
    }

    fn cache_installer(fixture: &ResolverFixture, mc: &MinecraftVersion, forge: &str, profile: serde_json::Value) {
        let installer = forge_artifact(mc, forge, Some("installer"), "jar");
        write_jar(
            &fixture.repository.resolve_path(&installer),
            &[(INSTALL_PROFILE, profile.to_string().as_bytes())],
        );
    }

    fn put(root: &Path, relative: &str, bytes: &[u8]) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    /// Simulates a 1.16.5 installer run; `skip` lists generated files it
    /// should not produce.
    fn installer(skip: &'static [&'static str]) -> impl Fn(&ProcessSpec) -> i32 + Send + Sync {
        move |spec| {
            let work = spec.cwd.clone().unwrap();
            assert!(work.join("launcher_profiles.json").exists());
            assert_eq!(&spec.args[2..], ["--installClient", "."]);

            let id = "1.16.5-forge-36.2.39";
            let manifest = json!({
                "id": id,
                "libraries": [
                    { "name": "net.minecraftforge:forge:1.16.5-36.2.39:universal",
                      "downloads": { "artifact": { "path": "net/minecraftforge/forge/1.16.5-36.2.39/forge-1.16.5-36.2.39-universal.jar", "url": "" } } },
                    { "name": "org.ow2.asm:asm:9.1",
                      "downloads": { "artifact": { "path": "org/ow2/asm/asm/9.1/asm-9.1.jar" } } }
                ]
            });
            put(&work, &format!("versions/{id}/{id}.json"), manifest.to_string().as_bytes());

            let libs = work.join("libraries");
            let files = [
                ("universal", "net/minecraftforge/forge/1.16.5-36.2.39/forge-1.16.5-36.2.39-universal.jar"),
                ("client", "net/minecraftforge/forge/1.16.5-36.2.39/forge-1.16.5-36.2.39-client.jar"),
                ("srg", "net/minecraft/client/1.16.5-20210115.111550/client-1.16.5-20210115.111550-srg.jar"),
                ("extra", "net/minecraft/client/1.16.5-20210115.111550/client-1.16.5-20210115.111550-extra.jar"),
                ("asm", "org/ow2/asm/asm/9.1/asm-9.1.jar"),
            ];
            for (name, path) in files {
                if !skip.contains(&name) {
                    put(&libs, path, name.as_bytes());
                }
            }
            0
        }
    }

    #[tokio::test]
    async fn harvests_generated_and_declared_libraries() {
        let fixture = ResolverFixture::new(FakeRunner::new(installer(&[])));
        cache_installer(&fixture, &mc(), FORGE, json!({ "data": { "MCP_VERSION": { "client": "'20210115.111550'" } } }));

        let module = ForgeGradle3Resolver
            .resolve(fixture.context(&mc(), FORGE))
            .await
            .unwrap();

        assert_eq!(
            module.id,
            "net.minecraftforge:forge:1.16.5-36.2.39:installer@jar"
        );
        assert_eq!(module.module_type, ModuleType::ForgeHosted);

        let ids: Vec<_> = module.sub_modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "net.minecraftforge:forge:1.16.5-36.2.39@json",
                "net.minecraftforge:forge:1.16.5-36.2.39:universal@jar",
                "net.minecraftforge:forge:1.16.5-36.2.39:client@jar",
                "net.minecraft:client:1.16.5-20210115.111550:srg@jar",
                "net.minecraft:client:1.16.5-20210115.111550:extra@jar",
                "org.ow2.asm:asm:9.1@jar",
            ]
        );
        assert_eq!(module.sub_modules[0].module_type, ModuleType::VersionManifest);
        assert_eq!(module.sub_modules[1].module_type, ModuleType::Library);

        let asm = &module.sub_modules[5];
        assert_eq!(asm.artifact.md5.as_deref(), Some(md5_hex(b"asm").as_str()));
        assert_eq!(
            asm.artifact.url,
            "https://cdn.example.com/repo/lib/org/ow2/asm/asm/9.1/asm-9.1.jar"
        );
        assert!(fixture
            .repository
            .resolve_path_by_id("net.minecraftforge:forge:1.16.5-36.2.39@json")
            .unwrap()
            .exists());
        assert!(!fixture.work_dir.join("forge-installer").exists());
        assert_eq!(fixture.transport.total_fetches(), 0);
    }

    #[tokio::test]
    async fn missing_optional_outputs_are_skipped() {
        let fixture = ResolverFixture::new(FakeRunner::new(installer(&["srg"])));
        cache_installer(&fixture, &mc(), FORGE, json!({ "data": { "MCP_VERSION": { "client": "'20210115.111550'" } } }));

        let module = ForgeGradle3Resolver
            .resolve(fixture.context(&mc(), FORGE))
            .await
            .unwrap();
        assert!(module.sub_modules.iter().all(|m| !m.id.contains(":srg@")));
        assert_eq!(module.sub_modules.len(), 5);
    }

    #[tokio::test]
    async fn missing_required_output_fails_and_cleans_up() {
        let fixture = ResolverFixture::new(FakeRunner::new(installer(&["extra"])));
        cache_installer(&fixture, &mc(), FORGE, json!({ "data": { "MCP_VERSION": { "client": "'20210115.111550'" } } }));

        let err = ForgeGradle3Resolver
            .resolve(fixture.context(&mc(), FORGE))
            .await
            .unwrap_err();
        assert!(matches!(err, NebulaError::NotFound(ref what) if what.contains("client extra")));
        assert!(!fixture.work_dir.join("forge-installer").exists());
    }

    #[tokio::test]
    async fn missing_declared_library_is_fatal() {
        let fixture = ResolverFixture::new(FakeRunner::new(installer(&["asm"])));
        cache_installer(&fixture, &mc(), FORGE, json!({ "data": { "MCP_VERSION": { "client": "'20210115.111550'" } } }));

        let err = ForgeGradle3Resolver
            .resolve(fixture.context(&mc(), FORGE))
            .await
            .unwrap_err();
        assert!(matches!(err, NebulaError::NotFound(ref what) if what.contains("org.ow2.asm:asm:9.1")));
    }

    #[tokio::test]
    async fn failing_installer_is_fatal() {
        let fixture = ResolverFixture::new(FakeRunner::new(|_| 1));
        cache_installer(&fixture, &mc(), FORGE, json!({}));

        let err = ForgeGradle3Resolver
            .resolve(fixture.context(&mc(), FORGE))
            .await
            .unwrap_err();
        assert!(matches!(err, NebulaError::ExternalTool { code: Some(1), .. }));
        assert!(!fixture.work_dir.join("forge-installer").exists());
    }

    #[tokio::test]
    async fn late_1_12_2_builds_only_need_the_forge_jar() {
        let runner = FakeRunner::new(|spec| {
            let work = spec.cwd.clone().unwrap();
            let id = "1.12.2-forge-14.23.5.2860";
            put(
                &work,
                &format!("versions/{id}/{id}.json"),
                json!({ "libraries": [{ "name": "net.minecraftforge:forge:1.12.2-14.23.5.2860" }] })
                    .to_string()
                    .as_bytes(),
            );
            put(
                &work.join("libraries"),
                "net/minecraftforge/forge/1.12.2-14.23.5.2860/forge-1.12.2-14.23.5.2860.jar",
                b"forge",
            );
            0
        });
        let fixture = ResolverFixture::new(runner);
        let mc = MinecraftVersion::parse("1.12.2").unwrap();
        cache_installer(&fixture, &mc, "14.23.5.2860", json!({}));

        let module = ForgeGradle3Resolver
            .resolve(fixture.context(&mc, "14.23.5.2860"))
            .await
            .unwrap();
        let ids: Vec<_> = module.sub_modules.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "net.minecraftforge:forge:1.12.2-14.23.5.2860@json",
                "net.minecraftforge:forge:1.12.2-14.23.5.2860@jar",
            ]
        );
    }

    #[test]
    fn mcp_version_falls_back_to_game_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let installer = dir.path().join("installer.jar");
        write_jar(&installer, &[(INSTALL_PROFILE, b"{}")]);
        let manifest: InstalledVersion = serde_json::from_value(json!({
            "arguments": { "game": ["--fml.forgeVersion", "36.2.39", "--fml.mcpVersion", "20210115.111550"] }
        }))
        .unwrap();

        assert_eq!(mcp_version(&installer, &manifest).unwrap(), MCP);

        let empty: InstalledVersion = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            mcp_version(&installer, &empty),
            Err(NebulaError::NotFound(_))
        ));
    }
}
