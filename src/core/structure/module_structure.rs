// ─── Module Structure ───
// A directory of the server layout whose files become modules. Implementors
// decide filtering and identity; the driver below does discovery, batch
// enrichment, hashing and namespace mapping the same way for all of them.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use super::discovery::{discover, ModuleCandidate};
use super::toggleable::ToggleableNamespace;
use super::untracked::{UntrackedFilesOption, UntrackedMatcher};
use crate::core::downloader::md5_file;
use crate::core::error::{NebulaError, NebulaResult};
use crate::core::http::join_url;
use crate::core::module::{Artifact, Module, ModuleType};
use crate::core::tools::{
    ClaritasException, ClaritasModuleMetadata, ClaritasResult, ClaritasWrapper, LibraryType,
};
use crate::core::version::MinecraftVersion;

/// Location of a structure on disk and on the distribution server.
pub struct StructureRoot {
    name: String,
    container_dir: PathBuf,
    base_url: String,
    relative_root: String,
    untracked: UntrackedMatcher,
    span: Span,
}

impl StructureRoot {
    /// `relative_root` is the URL path of `container_dir` below `base_url`.
    /// Untracked options apply when their `appliesTo` lists `name`.
    pub fn new(
        name: &str,
        container_dir: impl Into<PathBuf>,
        base_url: &str,
        relative_root: &str,
        untracked: &[UntrackedFilesOption],
        parent: &Span,
    ) -> NebulaResult<Self> {
        Ok(Self {
            name: name.to_string(),
            container_dir: container_dir.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            relative_root: relative_root.trim_matches('/').to_string(),
            untracked: UntrackedMatcher::for_root(untracked, name)?,
            span: info_span!(parent: parent, "structure", root = name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container_dir(&self) -> &Path {
        &self.container_dir
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn relative_root(&self) -> &str {
        &self.relative_root
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_untracked(&self, relative_path: &str) -> bool {
        self.untracked.is_untracked(relative_path)
    }
}

/// What a structure wants from the Claritas analyzer.
pub struct EnrichmentRequest<'a> {
    pub claritas: &'a ClaritasWrapper,
    pub library_type: LibraryType,
    pub minecraft_version: &'a MinecraftVersion,
    pub exceptions: &'a [ClaritasException],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait ModuleStructure: Send + Sync {
    fn root(&self) -> &StructureRoot;

    fn module_type(&self) -> ModuleType;

    /// Files live in `required/`, `optionalon/` and `optionaloff/`.
    fn is_toggleable(&self) -> bool {
        false
    }

    fn is_recursive(&self) -> bool {
        false
    }

    fn accepts(&self, _file: &str, _path: &Path, _stats: &Metadata) -> bool {
        true
    }

    fn enrichment(&self) -> Option<EnrichmentRequest<'_>> {
        None
    }

    /// Maven id and display name. Must not fail: bad metadata falls back to
    /// what the file name says.
    async fn identify(
        &self,
        candidate: &ModuleCandidate,
        metadata: Option<&ClaritasModuleMetadata>,
    ) -> ModuleIdentity;

    fn module_url(&self, candidate: &ModuleCandidate) -> NebulaResult<String> {
        let root = self.root();
        join_url(
            root.base_url(),
            &[root.relative_root(), &candidate.relative_path],
        )
        .map_err(NebulaError::Other)
    }

    /// Explicit install path, for modules whose path is not derived from the id.
    fn module_path(&self, _candidate: &ModuleCandidate) -> Option<String> {
        None
    }

    /// Cache behind [`ModuleStructure::spec_model`].
    fn memo(&self) -> &OnceCell<Vec<Module>>;

    /// All modules of this structure. Computed once per instance.
    async fn spec_model(&self, cancel: &CancellationToken) -> NebulaResult<Vec<Module>> {
        let modules = self
            .memo()
            .get_or_try_init(|| resolve_modules(self, cancel))
            .await?;
        Ok(modules.clone())
    }
}

/// Build `group:artifact:version[@ext]` from free-form parts.
pub fn maven_identifier(group: &str, artifact: &str, version: &str, extension: &str) -> String {
    let id = format!(
        "{}:{}:{}",
        sanitize_component(group),
        sanitize_component(artifact),
        sanitize_component(version)
    );
    if extension.is_empty() {
        id
    } else {
        format!("{}@{}", id, extension)
    }
}

/// Keep separators of the maven coordinate syntax out of a component.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| match c {
            ':' | '@' | '/' | '\\' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

pub async fn resolve_modules<S>(structure: &S, cancel: &CancellationToken) -> NebulaResult<Vec<Module>>
where
    S: ModuleStructure + ?Sized,
{
    let span = structure.root().span().clone();
    async move {
        let batch = collect_candidates(structure, cancel).await?;
        let metadata = enrich(structure, &batch, cancel).await?;

        let mut modules = Vec::with_capacity(batch.len());
        for (candidate, namespace) in &batch {
            if cancel.is_cancelled() {
                return Err(NebulaError::Cancelled);
            }
            let enriched = metadata.get(&metadata_key(&candidate.file_path));
            modules.push(parse_module(structure, candidate, *namespace, enriched).await?);
        }

        info!("Resolved {} module(s)", modules.len());
        Ok(modules)
    }
    .instrument(span)
    .await
}

async fn collect_candidates<S>(
    structure: &S,
    cancel: &CancellationToken,
) -> NebulaResult<Vec<(ModuleCandidate, Option<ToggleableNamespace>)>>
where
    S: ModuleStructure + ?Sized,
{
    let container = structure.root().container_dir();
    let filter = |file: &str, path: &Path, stats: &Metadata| structure.accepts(file, path, stats);

    let mut batch = Vec::new();
    if structure.is_toggleable() {
        for namespace in ToggleableNamespace::ALL {
            let dir = container.join(namespace.dir_name());
            let found = discover(&dir, container, structure.is_recursive(), &filter, cancel).await?;
            batch.extend(found.into_iter().map(|c| (c, Some(namespace))));
        }
    } else {
        let found = discover(container, container, structure.is_recursive(), &filter, cancel).await?;
        batch.extend(found.into_iter().map(|c| (c, None)));
    }
    debug!("Discovered {} candidate file(s)", batch.len());
    Ok(batch)
}

/// One Claritas call for the whole batch. Files matching an exception get
/// its proxy metadata instead of being analyzed. A failed analysis leaves
/// every file to its own fallback inference.
async fn enrich<S>(
    structure: &S,
    batch: &[(ModuleCandidate, Option<ToggleableNamespace>)],
    cancel: &CancellationToken,
) -> NebulaResult<ClaritasResult>
where
    S: ModuleStructure + ?Sized,
{
    let Some(request) = structure.enrichment() else {
        return Ok(ClaritasResult::new());
    };

    let mut proxied = ClaritasResult::new();
    let mut analyzed = Vec::new();
    for (candidate, _) in batch {
        match request.exceptions.iter().find(|e| e.matches(&candidate.file)) {
            Some(exception) => {
                debug!("{} skips analysis, using proxy metadata", candidate.file);
                proxied.insert(
                    metadata_key(&candidate.file_path),
                    exception.proxy_metadata.clone(),
                );
            }
            None => analyzed.push(candidate.file_path.clone()),
        }
    }

    let mut result = match request
        .claritas
        .execute(
            request.library_type,
            request.minecraft_version,
            &analyzed,
            cancel,
        )
        .await
    {
        Ok(result) => {
            for path in &analyzed {
                if !result.contains_key(&metadata_key(path)) {
                    warn!(
                        "Claritas returned no metadata for {}, falling back",
                        path.file_name().unwrap_or_default().to_string_lossy()
                    );
                }
            }
            result
        }
        Err(NebulaError::Cancelled) => return Err(NebulaError::Cancelled),
        Err(e) => {
            warn!(
                "{}; identifying {} file(s) from their own metadata",
                e,
                analyzed.len()
            );
            ClaritasResult::new()
        }
    };
    result.extend(proxied);
    Ok(result)
}

/// Turn one candidate into a module. Untracked files carry no MD5.
pub async fn parse_module<S>(
    structure: &S,
    candidate: &ModuleCandidate,
    namespace: Option<ToggleableNamespace>,
    metadata: Option<&ClaritasModuleMetadata>,
) -> NebulaResult<Module>
where
    S: ModuleStructure + ?Sized,
{
    let url = structure.module_url(candidate)?;
    let identity = structure.identify(candidate, metadata).await;

    let md5 = if structure.root().is_untracked(&candidate.relative_path) {
        debug!("{} is untracked", candidate.relative_path);
        None
    } else {
        Some(md5_file(&candidate.file_path).await?)
    };

    let mut module = Module::new(
        identity.id,
        identity.name,
        structure.module_type(),
        Artifact {
            size: candidate.stats.len(),
            md5,
            url,
            path: structure.module_path(candidate),
        },
    );
    if let Some(namespace) = namespace {
        namespace.apply(&mut module);
    }
    Ok(module)
}

fn metadata_key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
