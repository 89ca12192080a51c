pub mod gradle2;
pub mod gradle3;

use std::path::Path;

use tracing::warn;

pub use gradle2::ForgeGradle2Resolver;
pub use gradle3::ForgeGradle3Resolver;

use crate::core::downloader::md5_file;
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::maven::{
    ArtifactRepository, MavenArtifact, FORGE_MAVEN, LEGACY_FORGE_MAVEN, MOJANG_LIBRARIES,
};
use crate::core::module::{Artifact, Module, ModuleType};
use crate::core::version::{forge_artifact_version, MinecraftVersion};

pub const FORGE_GROUP: &str = "net.minecraftforge";
pub const FORGE_ARTIFACT: &str = "forge";
/// Library names starting with this refer to Forge itself.
const FORGE_SELF_PREFIX: &str = "net.minecraftforge:forge:";

pub(crate) fn forge_artifact(
    minecraft: &MinecraftVersion,
    forge_version: &str,
    classifier: Option<&str>,
    extension: &str,
) -> MavenArtifact {
    MavenArtifact::new(
        FORGE_GROUP,
        FORGE_ARTIFACT,
        forge_artifact_version(minecraft, forge_version),
        classifier,
        extension,
    )
}

pub(crate) fn is_forge_self_reference(library_name: &str) -> bool {
    library_name.starts_with(FORGE_SELF_PREFIX)
}

/// Display name of a library sub-module.
pub(crate) fn library_display_name(artifact: &MavenArtifact) -> String {
    match &artifact.classifier {
        Some(c) => format!("Minecraft Forge ({} {})", artifact.artifact_id, c),
        None => format!("Minecraft Forge ({})", artifact.artifact_id),
    }
}

/// Remote maven repository of a library declared with an optional `url`.
/// References to the retired Forge file server point at the current maven.
pub(crate) fn library_repository(url: Option<&str>) -> String {
    let Some(url) = url.map(|u| u.trim().trim_end_matches('/')).filter(|u| !u.is_empty()) else {
        return MOJANG_LIBRARIES.to_string();
    };
    let host_and_path = |u: &str| {
        u.trim_start_matches("https://")
            .trim_start_matches("http://")
            .to_string()
    };
    if host_and_path(url) == host_and_path(LEGACY_FORGE_MAVEN) {
        FORGE_MAVEN.to_string()
    } else {
        url.to_string()
    }
}

/// Artifact record of a file cached in the hosted repository.
pub(crate) async fn hosted_artifact(
    repository: &ArtifactRepository,
    base_url: &str,
    artifact: &MavenArtifact,
    local: &Path,
) -> NebulaResult<Artifact> {
    let stats = tokio::fs::metadata(local)
        .await
        .map_err(|e| NebulaError::io(local, e))?;
    Ok(Artifact {
        size: stats.len(),
        md5: Some(md5_file(local).await?),
        url: repository.resolve_url(base_url, artifact),
        path: None,
    })
}

pub(crate) async fn hosted_module(
    repository: &ArtifactRepository,
    base_url: &str,
    artifact: &MavenArtifact,
    local: &Path,
    name: String,
    module_type: ModuleType,
) -> NebulaResult<Module> {
    let record = hosted_artifact(repository, base_url, artifact, local).await?;
    Ok(Module::new(artifact.to_string(), name, module_type, record))
}

/// Empty `dir`, creating it if needed.
pub(crate) async fn recreate_dir(dir: &Path) -> NebulaResult<()> {
    if tokio::fs::try_exists(dir).await.unwrap_or(false) {
        tokio::fs::remove_dir_all(dir)
            .await
            .map_err(|e| NebulaError::io(dir, e))?;
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| NebulaError::io(dir, e))
}

/// Scratch cleanup; failures only warrant a warning.
pub(crate) async fn remove_dir_quietly(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove scratch directory {:?}: {}", dir, e);
        }
    }
}
