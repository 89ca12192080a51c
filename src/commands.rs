// ─── CLI commands ───
// Thin wrappers wiring the real HTTP transport and process runner into the
// server manager.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::config::GeneratorConfig;
use crate::core::downloader::Downloader;
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::process::SystemProcessRunner;
use crate::core::server::{ServerId, ServerManager, ServerManifest};
use crate::core::version::MinecraftVersion;

fn manager(config: GeneratorConfig) -> NebulaResult<ServerManager> {
    Ok(ServerManager::new(
        config,
        Arc::new(Downloader::new()?),
        Arc::new(SystemProcessRunner),
    ))
}

/// `init-server <name> <minecraft version>`
pub async fn init_server(
    config: GeneratorConfig,
    name: &str,
    minecraft_version: &str,
    forge_version: Option<String>,
) -> NebulaResult<PathBuf> {
    let id = ServerId::new(name, MinecraftVersion::parse(minecraft_version)?)?;
    let layout = manager(config)?.create(id, forge_version).await?;
    Ok(layout.path)
}

/// `generate-server <name>-<minecraft version>`; the JSON goes to `output`
/// or stdout.
pub async fn generate_server(
    config: GeneratorConfig,
    id: &str,
    output: Option<&Path>,
    cancel: &CancellationToken,
) -> NebulaResult<ServerManifest> {
    let id = ServerId::parse(id)?;
    let manifest = manager(config)?.generate(id, cancel).await?;
    let json = serde_json::to_string_pretty(&manifest)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| NebulaError::io(parent, e))?;
            }
            tokio::fs::write(path, json)
                .await
                .map_err(|e| NebulaError::io(path, e))?;
            info!("Wrote {:?}", path);
        }
        None => println!("{json}"),
    }
    Ok(manifest)
}
