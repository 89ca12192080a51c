// ─── ForgeGradle 2 ───
// Forge 1.7.10 through 1.12.2 (up to 14.23.5.2847). The universal jar embeds
// a `version.json` listing every library; some of them are only published as
// pack200+xz archives that have to be unpacked before they can be hashed.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, info_span, warn, Instrument};

use super::{
    forge_artifact, hosted_module, is_forge_self_reference, library_display_name,
    library_repository, recreate_dir, remove_dir_quietly,
};
use crate::core::downloader::{md5_file, sha1_file};
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::jar;
use crate::core::maven::{MavenArtifact, FORGE_MAVEN};
use crate::core::module::{Module, ModuleType};
use crate::core::resolver::{LoaderResolver, ResolveContext};
use crate::core::tools::{unpacked_path, PackOperation};

const EMBEDDED_MANIFEST: &str = "version.json";
const PACK_XZ_EXTENSION: &str = "jar.pack.xz";
const JAR_EXTENSION: &str = "jar";

/// Subset of the `version.json` embedded in universal jars.
#[derive(Debug, Deserialize)]
struct EmbeddedVersion {
    #[serde(default)]
    libraries: Vec<EmbeddedLibrary>,
}

#[derive(Debug, Deserialize)]
struct EmbeddedLibrary {
    name: String,
    /// Maven repository; Mojang's when absent.
    #[serde(default)]
    url: Option<String>,
    /// SHA-1 digests. Two entries mean a `.pack.xz` variant exists.
    #[serde(default)]
    checksums: Vec<String>,
    #[serde(default)]
    clientreq: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForgeGradle2Resolver;

#[async_trait]
impl LoaderResolver for ForgeGradle2Resolver {
    async fn resolve(&self, ctx: ResolveContext<'_>) -> NebulaResult<Module> {
        let span = info_span!(
            parent: ctx.span,
            "forge_gradle2",
            minecraft = %ctx.minecraft_version,
            forge = ctx.loader_version
        );
        resolve_universal(&ctx).instrument(span).await
    }
}

async fn resolve_universal(ctx: &ResolveContext<'_>) -> NebulaResult<Module> {
    let universal = forge_artifact(
        ctx.minecraft_version,
        ctx.loader_version,
        Some("universal"),
        JAR_EXTENSION,
    );
    info!("Resolving {}", universal);

    let universal_path = ctx
        .repository
        .ensure_artifact(FORGE_MAVEN, &universal, ctx.cancel)
        .await?;
    let version = read_embedded_version(&universal_path)?;

    let mut forge_module = hosted_module(
        ctx.repository,
        ctx.base_url,
        &universal,
        &universal_path,
        "Minecraft Forge".to_string(),
        ModuleType::ForgeHosted,
    )
    .await?;

    let mut pack_queue: Vec<(String, PathBuf)> = Vec::new();
    for library in &version.libraries {
        if ctx.cancel.is_cancelled() {
            return Err(NebulaError::Cancelled);
        }
        if is_forge_self_reference(&library.name) {
            debug!("Skipping self reference {}", library.name);
            continue;
        }
        if library.clientreq == Some(false) {
            debug!("Skipping server-only library {}", library.name);
            continue;
        }

        let remote = library_repository(library.url.as_deref());
        let declared = MavenArtifact::parse(&library.name)?;
        let extension = determine_extension(ctx, library, &declared, &remote).await;
        let artifact = declared.with_extension(extension);

        let local = acquire_library(ctx, library, &artifact, &remote).await?;
        let module = hosted_module(
            ctx.repository,
            ctx.base_url,
            &artifact,
            &local,
            library_display_name(&artifact),
            ModuleType::Library,
        )
        .await?;
        if extension == PACK_XZ_EXTENSION {
            pack_queue.push((module.id.clone(), local));
        }
        forge_module.sub_modules.push(module);
    }

    for (id, md5) in unpack_queued(ctx, &pack_queue).await? {
        if let Some(module) = forge_module.find_mut(&id) {
            module.artifact.md5 = Some(md5);
        }
    }

    info!(
        "Resolved Forge with {} libraries",
        forge_module.sub_modules.len()
    );
    Ok(forge_module)
}

fn read_embedded_version(universal: &Path) -> NebulaResult<EmbeddedVersion> {
    let raw = jar::read_entry(universal, EMBEDDED_MANIFEST)?.ok_or_else(|| {
        NebulaError::NotFound(format!(
            "{} inside {}",
            EMBEDDED_MANIFEST,
            universal.display()
        ))
    })?;
    serde_json::from_str(&raw).map_err(|e| NebulaError::MalformedMetadata {
        path: universal.to_path_buf(),
        reason: format!("{EMBEDDED_MANIFEST}: {e}"),
    })
}

/// `jar.pack.xz` when the library ships a packed variant we have or can
/// fetch, otherwise `jar`.
async fn determine_extension(
    ctx: &ResolveContext<'_>,
    library: &EmbeddedLibrary,
    declared: &MavenArtifact,
    remote: &str,
) -> &'static str {
    // Mojang-hosted libraries never have packed variants.
    if library.url.is_none() || library.checksums.len() < 2 {
        return JAR_EXTENSION;
    }
    let packed = declared.with_extension(PACK_XZ_EXTENSION);
    if ctx.repository.exists(&ctx.repository.resolve_path(&packed)).await {
        return PACK_XZ_EXTENSION;
    }
    if ctx.repository.head_exists(remote, &packed).await {
        return PACK_XZ_EXTENSION;
    }
    JAR_EXTENSION
}

/// Cached copy of a library, downloaded when absent. A cached plain jar whose
/// SHA-1 matches none of the declared checksums is downloaded once more.
async fn acquire_library(
    ctx: &ResolveContext<'_>,
    library: &EmbeddedLibrary,
    artifact: &MavenArtifact,
    remote: &str,
) -> NebulaResult<PathBuf> {
    let local = ctx.repository.resolve_path(artifact);
    let verifiable = artifact.extension == JAR_EXTENSION && !library.checksums.is_empty();

    if ctx.repository.exists(&local).await {
        if !verifiable {
            debug!("Using cached {}", artifact);
            return Ok(local);
        }
        match verify_checksum(&local, &library.checksums).await {
            Ok(()) => {
                debug!("Using cached {}", artifact);
                return Ok(local);
            }
            Err(e @ NebulaError::ChecksumMismatch { .. }) => {
                warn!("{}, downloading again", e);
            }
            Err(e) => return Err(e),
        }
    }

    ctx.repository
        .download_artifact(remote, artifact, ctx.cancel)
        .await?;

    if verifiable {
        match verify_checksum(&local, &library.checksums).await {
            Ok(()) => {}
            Err(e @ NebulaError::ChecksumMismatch { .. }) => {
                warn!("{} after redownload, keeping it", e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(local)
}

async fn verify_checksum(path: &Path, checksums: &[String]) -> NebulaResult<()> {
    let actual = sha1_file(path).await?;
    if checksums.iter().any(|c| c.eq_ignore_ascii_case(&actual)) {
        Ok(())
    } else {
        Err(NebulaError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: checksums.to_vec(),
            actual,
        })
    }
}

/// Unpack every queued `.pack.xz` in one tool call and hash the results.
/// Works on copies in a scratch directory so the repository keeps the packed
/// files it serves.
async fn unpack_queued(
    ctx: &ResolveContext<'_>,
    queue: &[(String, PathBuf)],
) -> NebulaResult<Vec<(String, String)>> {
    if queue.is_empty() {
        return Ok(Vec::new());
    }

    let scratch = ctx.work_dir.join("packxz");
    recreate_dir(&scratch).await?;
    let result = unpack_in(ctx, queue, &scratch).await;
    remove_dir_quietly(&scratch).await;
    result
}

async fn unpack_in(
    ctx: &ResolveContext<'_>,
    queue: &[(String, PathBuf)],
    scratch: &Path,
) -> NebulaResult<Vec<(String, String)>> {
    let mut copies = Vec::with_capacity(queue.len());
    for (_, local) in queue {
        let name = local.file_name().ok_or_else(|| {
            NebulaError::Other(format!("{} has no file name", local.display()))
        })?;
        let copy = scratch.join(name);
        tokio::fs::copy(local, &copy)
            .await
            .map_err(|e| NebulaError::io(local, e))?;
        copies.push(copy);
    }

    ctx.toolchain
        .pack_xz
        .extract(PackOperation::PackXz, &copies, ctx.cancel)
        .await?;

    let mut digests = Vec::with_capacity(queue.len());
    for ((id, _), copy) in queue.iter().zip(&copies) {
        let unpacked = unpacked_path(copy, PackOperation::PackXz);
        if !tokio::fs::try_exists(&unpacked).await.unwrap_or(false) {
            warn!("PackXZExtract produced no {:?}", unpacked.file_name().unwrap_or_default());
            return Err(NebulaError::ExternalTool {
                tool: "PackXZExtract".to_string(),
                code: Some(0),
            });
        }
        digests.push((id.clone(), md5_file(&unpacked).await?));
    }
    Ok(digests)
}
