use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the manifest generator.
/// Every module returns `Result<T, NebulaError>`.
#[derive(Debug, Error)]
pub enum NebulaError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    // ── Integrity ───────────────────────────────────────
    #[error("Checksum mismatch for {path:?}: expected one of {expected:?}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: Vec<String>,
        actual: String,
    },

    // ── Maven / versions ────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    #[error("Invalid Minecraft version: {0}")]
    InvalidVersion(String),

    // ── Resolution ──────────────────────────────────────
    #[error("Expected artifact not found: {0}")]
    NotFound(String),

    #[error("Malformed metadata in {path:?}: {reason}")]
    MalformedMetadata { path: PathBuf, reason: String },

    #[error("Server already exists: {0}")]
    ServerExists(String),

    #[error("No strategy registered for Minecraft {minecraft} with loader {loader}")]
    NoStrategyFound { minecraft: String, loader: String },

    // ── External tools ──────────────────────────────────
    #[error("Metadata enrichment failed: {0}")]
    Enrichment(String),

    #[error("{tool} failed (exit code {code:?})")]
    ExternalTool { tool: String, code: Option<i32> },

    #[error("Failed to spawn {tool}: {source}")]
    ToolSpawn {
        tool: String,
        source: std::io::Error,
    },

    // ── Formats ─────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    // ── Generic ─────────────────────────────────────────
    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type NebulaResult<T> = Result<T, NebulaError>;

impl NebulaError {
    /// Wrap an IO error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        NebulaError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for NebulaError {
    fn from(source: std::io::Error) -> Self {
        NebulaError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
