//! In-memory stand-ins for the network and subprocess seams, plus fixture
//! helpers shared by unit tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::core::config::GeneratorConfig;
use crate::core::downloader::Transport;
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::maven::{ArtifactRepository, LIBRARY_REPOSITORY_PATH};
use crate::core::process::{ProcessOutcome, ProcessRunner, ProcessSpec};
use crate::core::resolver::ResolveContext;
use crate::core::tools::Toolchain;
use crate::core::version::MinecraftVersion;

/// Serves registered URLs from memory and counts every request.
#[derive(Default)]
pub struct FakeTransport {
    files: Mutex<HashMap<String, Vec<u8>>>,
    stalled: Mutex<HashMap<String, Vec<u8>>>,
    broken_prefixes: Mutex<Vec<String>>,
    fetches: Mutex<HashMap<String, usize>>,
    heads: Mutex<HashMap<String, usize>>,
}

impl FakeTransport {
    pub fn serve(&self, url: &str, bytes: &[u8]) {
        self.stalled.lock().unwrap().remove(url);
        self.files
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
    }

    /// Write `bytes` for `url`, then hang until the fetch is dropped.
    pub fn stall_after(&self, url: &str, bytes: &[u8]) {
        self.stalled
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
    }

    pub fn fail_heads_for(&self, prefix: &str) {
        self.broken_prefixes.lock().unwrap().push(prefix.to_string());
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }

    pub fn head_count(&self, url: &str) -> usize {
        self.heads.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, url: &str, dest: &Path) -> NebulaResult<u64> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let stalled = self.stalled.lock().unwrap().get(url).cloned();
        if let Some(bytes) = stalled {
            std::fs::write(dest, &bytes).map_err(|e| NebulaError::io(dest, e))?;
            std::future::pending::<()>().await;
        }

        let bytes = self.files.lock().unwrap().get(url).cloned();
        match bytes {
            Some(bytes) => {
                tokio::fs::write(dest, &bytes)
                    .await
                    .map_err(|e| NebulaError::io(dest, e))?;
                Ok(bytes.len() as u64)
            }
            None => Err(NebulaError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn head(&self, url: &str) -> NebulaResult<bool> {
        *self
            .heads
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let broken = self
            .broken_prefixes
            .lock()
            .unwrap()
            .iter()
            .any(|p| url.starts_with(p.as_str()));
        if broken {
            return Err(NebulaError::Other(format!("connection refused: {url}")));
        }
        Ok(self.files.lock().unwrap().contains_key(url))
    }
}

type Handler = Box<dyn Fn(&ProcessSpec) -> i32 + Send + Sync>;

/// Records every invocation and lets the test simulate the tool's effects.
pub struct FakeRunner {
    handler: Handler,
    calls: Mutex<Vec<ProcessSpec>>,
}

impl FakeRunner {
    pub fn new(handler: impl Fn(&ProcessSpec) -> i32 + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ProcessSpec> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        spec: &ProcessSpec,
        _cancel: &CancellationToken,
    ) -> NebulaResult<ProcessOutcome> {
        self.calls.lock().unwrap().push(spec.clone());
        let code = (self.handler)(spec);
        Ok(ProcessOutcome { code: Some(code) })
    }
}

/// Formatted log output of the current thread, for asserting on warnings.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Route this thread's events here until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Write a zip archive containing the given `(entry name, contents)` pairs.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.finish().unwrap();
}

/// Build a zip archive in memory.
pub fn jar_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        for (name, contents) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(contents).unwrap();
        }
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

/// Lowercase hex MD5 of an in-memory buffer.
pub fn md5_hex(bytes: &[u8]) -> String {
    use md5::{Digest, Md5};
    hex::encode(Md5::digest(bytes))
}

/// Lowercase hex SHA-1 of an in-memory buffer.
pub fn sha1_hex(bytes: &[u8]) -> String {
    use sha1::{Digest, Sha1};
    hex::encode(Sha1::digest(bytes))
}

/// Repository, toolchain and scratch space for driving a resolver in tests.
pub struct ResolverFixture {
    pub dir: tempfile::TempDir,
    pub transport: Arc<FakeTransport>,
    pub runner: Arc<FakeRunner>,
    pub repository: ArtifactRepository,
    pub toolchain: Toolchain,
    pub work_dir: PathBuf,
    pub span: Span,
    pub cancel: CancellationToken,
}

pub const BASE_URL: &str = "https://cdn.example.com";

impl ResolverFixture {
    pub fn new(runner: FakeRunner) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(FakeTransport::default());
        let runner = Arc::new(runner);
        let config = GeneratorConfig {
            root: dir.path().to_path_buf(),
            pack_xz_extract_jar: Some(PathBuf::from("/opt/PackXZExtract.jar")),
            headless_installer: true,
            ..Default::default()
        };
        let repository = ArtifactRepository::new(
            config.library_repository_dir(),
            LIBRARY_REPOSITORY_PATH,
            transport.clone(),
        );
        let toolchain = Toolchain::from_config(&config, runner.clone());
        Self {
            work_dir: config.work_dir(),
            dir,
            transport,
            runner,
            repository,
            toolchain,
            span: Span::none(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn context<'a>(
        &'a self,
        minecraft_version: &'a MinecraftVersion,
        loader_version: &'a str,
    ) -> ResolveContext<'a> {
        ResolveContext {
            minecraft_version,
            loader_version,
            base_url: BASE_URL,
            repository: &self.repository,
            toolchain: &self.toolchain,
            work_dir: &self.work_dir,
            span: &self.span,
            cancel: &self.cancel,
        }
    }
}
