use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::core::error::{NebulaError, NebulaResult};
use crate::core::process::{run_checked, ProcessRunner, ProcessSpec};

/// What the unpack tool should undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackOperation {
    /// `.jar.pack.xz` → `.jar`
    PackXz,
    /// `.xz` → plain file
    Xz,
    /// `.pack` → `.jar`
    Pack,
}

impl PackOperation {
    pub fn flag(&self) -> &'static str {
        match self {
            PackOperation::PackXz => "-packxz",
            PackOperation::Xz => "-xz",
            PackOperation::Pack => "-pack",
        }
    }

    /// Suffix stripped from each input to name its output.
    pub fn suffix(&self) -> &'static str {
        match self {
            PackOperation::PackXz => ".pack.xz",
            PackOperation::Xz => ".xz",
            PackOperation::Pack => ".pack",
        }
    }
}

/// Wrapper around PackXZExtract, the legacy pack200/xz decompressor.
///
/// Outputs are written next to their inputs; the tool reports nothing beyond
/// its exit code.
pub struct PackXzExtract {
    java: PathBuf,
    jar: Option<PathBuf>,
    runner: Arc<dyn ProcessRunner>,
}

impl PackXzExtract {
    pub fn new(java: impl Into<PathBuf>, jar: Option<PathBuf>, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            java: java.into(),
            jar,
            runner,
        }
    }

    /// Unpack every file in one process call.
    pub async fn extract(
        &self,
        operation: PackOperation,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> NebulaResult<()> {
        if files.is_empty() {
            return Ok(());
        }
        let jar = self.jar.as_ref().ok_or_else(|| {
            NebulaError::Other(
                "PackXZExtract is required for this Forge version but packXzExtractJar is not configured"
                    .to_string(),
            )
        })?;

        let joined = files
            .iter()
            .map(|f| f.to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(",");

        info!("Unpacking {} file(s) with PackXZExtract", files.len());
        let spec = ProcessSpec::java_jar(
            "PackXZExtract",
            &self.java,
            jar,
            vec![operation.flag().to_string(), joined],
        );
        run_checked(self.runner.as_ref(), &spec, cancel).await
    }
}

/// Path the tool writes for `input`.
pub fn unpacked_path(input: &std::path::Path, operation: PackOperation) -> PathBuf {
    let name = input.to_string_lossy();
    match name.strip_suffix(operation.suffix()) {
        Some(stripped) => PathBuf::from(stripped),
        None => input.to_path_buf(),
    }
}
