use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::{NebulaError, NebulaResult};
use crate::core::maven::LIBRARY_REPOSITORY_PATH;

const APP_DIR_NAME: &str = "nebula";
pub const CONFIG_FILE: &str = "nebula.json";

/// Settings of one generator installation.
///
/// Loaded from `nebula.json` (every field optional), then overridden by the
/// `NEBULA_ROOT`, `NEBULA_BASE_URL` and `JAVA_EXECUTABLE` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    /// Distribution root: `repo/` and `servers/` live here.
    pub root: PathBuf,
    /// Public URL the root is served from.
    pub base_url: String,
    pub java_executable: PathBuf,
    /// Claritas metadata analyzer. Without it mods are identified from their
    /// own manifests and file names only.
    pub claritas_jar: Option<PathBuf>,
    /// PackXZExtract, needed for Forge builds that ship `.pack.xz` libraries.
    pub pack_xz_extract_jar: Option<PathBuf>,
    /// Pass `--installClient` to Forge installers instead of showing their UI.
    pub headless_installer: bool,
    /// Scratch space; defaults to `<root>/work`.
    pub work_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            base_url: "http://localhost:8080".to_string(),
            java_executable: PathBuf::from("java"),
            claritas_jar: None,
            pack_xz_extract_jar: None,
            headless_installer: false,
            work_dir: None,
        }
    }
}

impl GeneratorConfig {
    /// Load from `path` when it exists, otherwise start from defaults, then
    /// apply environment overrides and make every configured path absolute.
    pub fn load(path: Option<&Path>) -> NebulaResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    fn load_with_env(
        path: Option<&Path>,
        var: impl Fn(&str) -> Option<String>,
    ) -> NebulaResult<Self> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p).map_err(|e| NebulaError::io(p, e))?;
                info!("Loaded configuration from {:?}", p);
                serde_json::from_str(&raw)?
            }
            Some(p) => {
                debug!("No configuration at {:?}, using defaults", p);
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_env(var);
        config.make_absolute()?;
        Ok(config)
    }

    /// Tools run with a scratch directory as their working directory, so
    /// every path handed to them has to be absolute. A bare `java` stays a
    /// `PATH` lookup.
    fn make_absolute(&mut self) -> NebulaResult<()> {
        self.root = absolute(&self.root)?;
        if let Some(work) = &self.work_dir {
            self.work_dir = Some(absolute(work)?);
        }
        if self.java_executable.components().count() > 1 {
            self.java_executable = absolute(&self.java_executable)?;
        }
        for jar in [&mut self.claritas_jar, &mut self.pack_xz_extract_jar]
            .into_iter()
            .flatten()
        {
            *jar = absolute(jar)?;
        }
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(root) = var("NEBULA_ROOT").filter(|v| !v.is_empty()) {
            self.root = PathBuf::from(root);
        }
        if let Some(url) = var("NEBULA_BASE_URL").filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(java) = var("JAVA_EXECUTABLE").filter(|v| !v.is_empty()) {
            self.java_executable = PathBuf::from(java);
        }
    }

    /// Hosted maven repository, `<root>/repo/lib`.
    pub fn library_repository_dir(&self) -> PathBuf {
        self.root.join(LIBRARY_REPOSITORY_PATH)
    }

    pub fn servers_dir(&self) -> PathBuf {
        self.root.join("servers")
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| self.root.join("work"))
    }

    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn absolute(path: &Path) -> NebulaResult<PathBuf> {
    std::path::absolute(path).map_err(|e| NebulaError::io(path, e))
}

fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
