use std::fs::Metadata;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::error::{NebulaError, NebulaResult};

/// Operating-system clutter that never becomes a module.
pub const FILE_NAME_BLACKLIST: &[&str] = &[".gitkeep", ".DS_Store", "Thumbs.db"];

/// A file found on disk that may become a module.
#[derive(Debug, Clone)]
pub struct ModuleCandidate {
    pub file: String,
    pub file_path: PathBuf,
    /// `/`-separated path relative to the structure's container directory.
    pub relative_path: String,
    pub stats: Metadata,
}

/// List the regular files under `scan_dir`, sorted by relative path.
///
/// Paths are made relative to `base_dir`, which must contain `scan_dir`.
/// A missing `scan_dir` yields nothing. `filter` sees the file name, its
/// absolute path and its metadata.
pub async fn discover(
    scan_dir: &Path,
    base_dir: &Path,
    recursive: bool,
    filter: &(dyn Fn(&str, &Path, &Metadata) -> bool + Send + Sync),
    cancel: &CancellationToken,
) -> NebulaResult<Vec<ModuleCandidate>> {
    if !tokio::fs::try_exists(scan_dir).await.unwrap_or(false) {
        debug!("{:?} does not exist, nothing to discover", scan_dir);
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    let mut pending = vec![scan_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        if cancel.is_cancelled() {
            return Err(NebulaError::Cancelled);
        }
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| NebulaError::io(&dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| NebulaError::io(&dir, e))?
        {
            let path = entry.path();
            let link = tokio::fs::symlink_metadata(&path)
                .await
                .map_err(|e| NebulaError::io(&path, e))?;

            // Symlinked files are followed; symlinked directories are not,
            // which keeps the walk free of cycles.
            let stats = if link.file_type().is_symlink() {
                match tokio::fs::metadata(&path).await {
                    Ok(target) if target.is_file() => target,
                    Ok(_) => {
                        warn!("Skipping symlink {:?}, it does not point to a file", path);
                        continue;
                    }
                    Err(e) => {
                        warn!("Skipping dangling symlink {:?}: {}", path, e);
                        continue;
                    }
                }
            } else {
                link
            };

            if stats.is_dir() {
                if recursive {
                    pending.push(path);
                }
                continue;
            }
            if !stats.is_file() {
                debug!("Skipping {:?}, not a regular file", path);
                continue;
            }

            let file = entry.file_name().to_string_lossy().to_string();
            if FILE_NAME_BLACKLIST.contains(&file.as_str()) || !filter(&file, &path, &stats) {
                continue;
            }

            let relative_path = relative_slash_path(&path, base_dir)?;
            candidates.push(ModuleCandidate {
                file,
                file_path: path,
                relative_path,
                stats,
            });
        }
    }

    candidates.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(candidates)
}

fn relative_slash_path(path: &Path, base_dir: &Path) -> NebulaResult<String> {
    let relative = path.strip_prefix(base_dir).map_err(|_| {
        NebulaError::Other(format!("{:?} is not inside {:?}", path, base_dir))
    })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"x").unwrap();
    }

    #[tokio::test]
    async fn lists_files_and_skips_clutter() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("b.jar"));
        touch(&dir.path().join("a.jar"));
        touch(&dir.path().join(".gitkeep"));
        touch(&dir.path().join("nested/c.jar"));

        let found = discover(
            dir.path(),
            dir.path(),
            false,
            &|_, _, _| true,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let names: Vec<_> = found.iter().map(|c| c.relative_path.as_str()).collect();
        assert_eq!(names, vec!["a.jar", "b.jar"]);
        assert_eq!(found[0].stats.len(), 1);
    }

    #[tokio::test]
    async fn recursive_paths_are_relative_to_the_base() {
        let dir = tempfile::tempdir().unwrap();
        let files = dir.path().join("files");
        touch(&files.join("config/forge.cfg"));
        touch(&files.join("options.txt"));
        touch(&files.join("config/skip.bak"));

        let found = discover(
            &files,
            dir.path(),
            true,
            &|name, _, _| !name.ends_with(".bak"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let names: Vec<_> = found.iter().map(|c| c.relative_path.as_str()).collect();
        assert_eq!(names, vec!["files/config/forge.cfg", "files/options.txt"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_files_are_followed() {
        let dir = tempfile::tempdir().unwrap();
        let mods = dir.path().join("mods");
        touch(&dir.path().join("shared/Shared-1.0.jar"));
        touch(&mods.join("own.jar"));
        std::os::unix::fs::symlink(
            dir.path().join("shared/Shared-1.0.jar"),
            mods.join("Shared-1.0.jar"),
        )
        .unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.jar"), mods.join("dangling.jar")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("shared"), mods.join("linked-dir")).unwrap();

        let found = discover(&mods, &mods, true, &|_, _, _| true, &CancellationToken::new())
            .await
            .unwrap();

        let names: Vec<_> = found.iter().map(|c| c.relative_path.as_str()).collect();
        assert_eq!(names, vec!["Shared-1.0.jar", "own.jar"]);
        assert!(found[0].stats.is_file());
    }

    #[tokio::test]
    async fn missing_directories_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let found = discover(
            &dir.path().join("absent"),
            dir.path(),
            true,
            &|_, _, _| true,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.jar"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = discover(dir.path(), dir.path(), false, &|_, _, _| true, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, NebulaError::Cancelled));
    }
}
