use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::error::{NebulaError, NebulaResult};

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Human readable tool name used in logs and errors.
    pub tool: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ProcessSpec {
    /// `java -jar <jar> <args...>`
    pub fn java_jar(
        tool: impl Into<String>,
        java: &Path,
        jar: &Path,
        args: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut all_args = vec!["-jar".to_string(), jar.to_string_lossy().to_string()];
        all_args.extend(args);
        Self {
            tool: tool.into(),
            program: java.to_path_buf(),
            args: all_args,
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Narrow capability for spawning external tools.
///
/// Production code uses [`SystemProcessRunner`]; tests inject a fake that
/// simulates the tool's side effects on disk.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion. Spawn failures are errors, non-zero exits are not.
    async fn run(
        &self,
        spec: &ProcessSpec,
        cancel: &CancellationToken,
    ) -> NebulaResult<ProcessOutcome>;
}

/// Spawns real subprocesses, relaying their output line by line to tracing.
pub struct SystemProcessRunner;

#[async_trait]
impl ProcessRunner for SystemProcessRunner {
    async fn run(
        &self,
        spec: &ProcessSpec,
        cancel: &CancellationToken,
    ) -> NebulaResult<ProcessOutcome> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        debug!("Spawning {}: {:?} {:?}", spec.tool, spec.program, spec.args);
        let mut child = cmd.spawn().map_err(|source| NebulaError::ToolSpawn {
            tool: spec.tool.clone(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(relay_lines(spec.tool.clone(), out, false)));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(relay_lines(spec.tool.clone(), err, true)));

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Cancelling {}", spec.tool);
                let _ = child.kill().await;
                return Err(NebulaError::Cancelled);
            }
            status = child.wait() => status.map_err(|source| NebulaError::ToolSpawn {
                tool: spec.tool.clone(),
                source,
            })?,
        };

        for relay in [stdout, stderr].into_iter().flatten() {
            let _ = relay.await;
        }

        info!("{} exited with {:?}", spec.tool, status.code());
        Ok(ProcessOutcome {
            code: status.code(),
        })
    }
}

/// Relay output to tracing until EOF, returning the number of lines seen.
/// Lines are decoded lossily: installers on legacy code pages emit bytes
/// that are not UTF-8, and the pipe must keep draining past them.
async fn relay_lines<R>(tool: String, reader: R, is_stderr: bool) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut count = 0;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Stopped reading {} output: {}", tool, e);
                break;
            }
        }
        count += 1;
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if is_stderr {
            warn!(target: "nebula::tool", "[{}] {}", tool, line);
        } else {
            debug!(target: "nebula::tool", "[{}] {}", tool, line);
        }
    }
    count
}

/// Run a tool and require a zero exit code.
pub async fn run_checked(
    runner: &dyn ProcessRunner,
    spec: &ProcessSpec,
    cancel: &CancellationToken,
) -> NebulaResult<()> {
    let outcome = runner.run(spec, cancel).await?;
    if !outcome.success() {
        return Err(NebulaError::ExternalTool {
            tool: spec.tool.clone(),
            code: outcome.code,
        });
    }
    Ok(())
}

/// Run a tool that reports its result through a JSON file.
///
/// Resolves once the process exited successfully and `output` parsed.
pub async fn run_for_json<T: DeserializeOwned>(
    runner: &dyn ProcessRunner,
    spec: &ProcessSpec,
    output: &Path,
    cancel: &CancellationToken,
) -> NebulaResult<T> {
    run_checked(runner, spec, cancel).await?;

    if !tokio::fs::try_exists(output).await.unwrap_or(false) {
        return Err(NebulaError::NotFound(format!(
            "{} output file {}",
            spec.tool,
            output.display()
        )));
    }

    let raw = tokio::fs::read_to_string(output)
        .await
        .map_err(|e| NebulaError::io(output, e))?;
    Ok(serde_json::from_str(&raw)?)
}
