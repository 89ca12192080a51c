// ─── Claritas ───
// Adapter for the external jar analyzer that infers group/id/version of mods
// from their compiled classes.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::error::{NebulaError, NebulaResult};
use crate::core::process::{run_for_json, ProcessRunner, ProcessSpec};
use crate::core::version::MinecraftVersion;

/// Best-effort metadata inferred for one jar. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClaritasModuleMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mod_type: Option<String>,
}

/// Absolute jar path → inferred metadata, for one batch.
pub type ClaritasResult = HashMap<String, ClaritasModuleMetadata>;

/// Loader family the analyzer should look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryType {
    Forge,
}

impl fmt::Display for LibraryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryType::Forge => f.write_str("FORGE"),
        }
    }
}

/// A jar known to confuse the analyzer. Files whose name contains
/// `name_fragment` (case-insensitive) skip analysis and get `proxy_metadata`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaritasException {
    pub name_fragment: String,
    pub proxy_metadata: ClaritasModuleMetadata,
}

impl ClaritasException {
    pub fn matches(&self, file_name: &str) -> bool {
        file_name
            .to_lowercase()
            .contains(&self.name_fragment.to_lowercase())
    }
}

pub struct ClaritasWrapper {
    java: PathBuf,
    jar: PathBuf,
    work_dir: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl ClaritasWrapper {
    pub fn new(
        java: impl Into<PathBuf>,
        jar: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            java: java.into(),
            jar: jar.into(),
            work_dir: work_dir.into(),
            runner,
        }
    }

    /// Analyze one batch of jars with a single process invocation.
    ///
    /// Fails with [`NebulaError::Enrichment`] when the analyzer exits non-zero
    /// or does not produce its output file.
    pub async fn execute(
        &self,
        library_type: LibraryType,
        minecraft_version: &MinecraftVersion,
        absolute_jar_paths: &[PathBuf],
        cancel: &CancellationToken,
    ) -> NebulaResult<ClaritasResult> {
        if absolute_jar_paths.is_empty() {
            return Ok(ClaritasResult::new());
        }

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| NebulaError::io(&self.work_dir, e))?;

        let args_file = self.work_dir.join("claritas-args.txt");
        let output_file = self.work_dir.join("claritas-output.json");
        if tokio::fs::try_exists(&output_file).await.unwrap_or(false) {
            tokio::fs::remove_file(&output_file)
                .await
                .map_err(|e| NebulaError::io(&output_file, e))?;
        }

        let args = batch_arguments(
            library_type,
            minecraft_version,
            absolute_jar_paths,
            &output_file,
        );
        tokio::fs::write(&args_file, args)
            .await
            .map_err(|e| NebulaError::io(&args_file, e))?;

        info!(
            "Running Claritas over {} {} jar(s)",
            absolute_jar_paths.len(),
            library_type
        );
        let spec = ProcessSpec::java_jar(
            "Claritas",
            &self.java,
            &self.jar,
            vec![format!("@{}", args_file.to_string_lossy())],
        )
        .in_dir(&self.work_dir);

        let result: ClaritasResult = run_for_json(self.runner.as_ref(), &spec, &output_file, cancel)
            .await
            .map_err(|e| match e {
                NebulaError::Cancelled => NebulaError::Cancelled,
                other => NebulaError::Enrichment(other.to_string()),
            })?;

        debug!("Claritas produced metadata for {} jar(s)", result.len());
        Ok(result)
    }
}

/// Contents of the argument file, one option or value per line. Values are
/// quoted so paths with spaces survive.
fn batch_arguments(
    library_type: LibraryType,
    minecraft_version: &MinecraftVersion,
    absolute_jar_paths: &[PathBuf],
    output_file: &Path,
) -> String {
    let joined = absolute_jar_paths
        .iter()
        .map(|p| p.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(",");

    [
        ("--absoluteJarPaths", joined),
        ("--libraryType", library_type.to_string()),
        ("--mcVersion", minecraft_version.to_string()),
        ("--outputFile", output_file.to_string_lossy().to_string()),
    ]
    .iter()
    .map(|(flag, value)| format!("{}\n{}\n", flag, quote(value)))
    .collect()
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
