use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::artifact::MavenArtifact;
use crate::core::downloader::Transport;
use crate::core::error::{NebulaError, NebulaResult};

/// Maven-layout local cache rooted at one container directory.
///
/// The same relative layout is published under `<base_url>/<url_prefix>/`,
/// so every cached file has both a local path and a distribution URL.
///
/// Downloads are serialized per target path: two callers asking for the same
/// never-seen artifact end up with one fetch and an intact file. Nothing guards
/// against a second process using the same container directory.
pub struct ArtifactRepository {
    container_dir: PathBuf,
    url_prefix: String,
    transport: Arc<dyn Transport>,
    path_locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl ArtifactRepository {
    pub fn new(
        container_dir: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            container_dir: container_dir.into(),
            url_prefix: url_prefix.into().trim_matches('/').to_string(),
            transport,
            path_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn container_dir(&self) -> &Path {
        &self.container_dir
    }

    /// Absolute cache path of an artifact.
    pub fn resolve_path(&self, artifact: &MavenArtifact) -> PathBuf {
        self.container_dir.join(artifact.local_path())
    }

    /// Absolute cache path of a maven identifier.
    pub fn resolve_path_by_id(&self, id: &str) -> NebulaResult<PathBuf> {
        Ok(self.resolve_path(&MavenArtifact::parse(id)?))
    }

    /// Distribution URL of an artifact hosted from this repository.
    pub fn resolve_url(&self, base_url: &str, artifact: &MavenArtifact) -> String {
        let base = base_url.trim_end_matches('/');
        if self.url_prefix.is_empty() {
            artifact.url(base)
        } else {
            artifact.url(&format!("{}/{}", base, self.url_prefix))
        }
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    /// Download `remote_url` to `local_relative` under the container,
    /// replacing whatever is there. Failures propagate; there is no retry.
    pub async fn download(
        &self,
        remote_url: &str,
        local_relative: &Path,
        cancel: &CancellationToken,
    ) -> NebulaResult<PathBuf> {
        let dest = self.container_dir.join(local_relative);
        let lock = self.lock_for(&dest);
        let _guard = lock.lock().await;
        self.fetch_locked(remote_url, &dest, cancel).await?;
        Ok(dest)
    }

    /// Download an artifact from a remote maven repository into the cache,
    /// unconditionally.
    pub async fn download_artifact(
        &self,
        remote_repo: &str,
        artifact: &MavenArtifact,
        cancel: &CancellationToken,
    ) -> NebulaResult<PathBuf> {
        debug!("Downloading {} from {}", artifact, remote_repo);
        self.download(&artifact.url(remote_repo), &artifact.local_path(), cancel)
            .await
    }

    /// Return the cached path of an artifact, downloading it first if absent.
    /// The existence check happens under the per-path lock.
    pub async fn ensure_artifact(
        &self,
        remote_repo: &str,
        artifact: &MavenArtifact,
        cancel: &CancellationToken,
    ) -> NebulaResult<PathBuf> {
        let dest = self.resolve_path(artifact);
        let lock = self.lock_for(&dest);
        let _guard = lock.lock().await;

        if self.exists(&dest).await {
            debug!("Using cached {}", artifact);
        } else {
            debug!("{} not cached, downloading from {}", artifact, remote_repo);
            self.fetch_locked(&artifact.url(remote_repo), &dest, cancel)
                .await?;
        }
        Ok(dest)
    }

    /// Probe a remote repository for an artifact without downloading it.
    /// Any failure counts as "absent".
    pub async fn head_exists(&self, remote_repo: &str, artifact: &MavenArtifact) -> bool {
        let url = artifact.url(remote_repo);
        match self.transport.head(&url).await {
            Ok(found) => found,
            Err(e) => {
                debug!("HEAD {} failed: {}", url, e);
                false
            }
        }
    }

    /// Move a locally generated file into the repository layout, overwriting
    /// any previous copy.
    pub async fn install_file(&self, src: &Path, artifact: &MavenArtifact) -> NebulaResult<PathBuf> {
        let dest = self.resolve_path(artifact);
        let lock = self.lock_for(&dest);
        let _guard = lock.lock().await;

        create_parent(&dest).await?;
        if tokio::fs::rename(src, &dest).await.is_err() {
            // Cross-device moves fall back to copy + remove.
            tokio::fs::copy(src, &dest)
                .await
                .map_err(|e| NebulaError::io(src, e))?;
            if let Err(e) = tokio::fs::remove_file(src).await {
                warn!("Could not remove {:?} after copying it: {}", src, e);
            }
        }
        Ok(dest)
    }

    /// Streams into `<dest>.part` and renames onto `dest` only once the
    /// transfer completed, so an interrupted download never looks cached.
    async fn fetch_locked(
        &self,
        url: &str,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> NebulaResult<()> {
        create_parent(dest).await?;
        let partial = partial_path(dest);
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NebulaError::Cancelled),
            result = self.transport.fetch(url, &partial) => result.map(|_| ()),
        };

        let finished = match fetched {
            Ok(()) => tokio::fs::rename(&partial, dest)
                .await
                .map_err(|e| NebulaError::io(dest, e)),
            Err(e) => Err(e),
        };
        if finished.is_err() {
            if let Err(e) = tokio::fs::remove_file(&partial).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove partial download {:?}: {}", partial, e);
                }
            }
        }
        finished
    }

    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.path_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Drop locks nobody holds or waits on any more.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(path.to_path_buf()).or_default().clone()
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn create_parent(path: &Path) -> NebulaResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| NebulaError::io(parent, e))?;
    }
    Ok(())
}
