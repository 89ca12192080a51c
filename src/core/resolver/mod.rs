// ─── Loader resolvers ───
// Turn a (Minecraft, Forge) version pair into the loader's module tree.
// One resolver exists per Forge generation; the registry picks it.

pub mod forge;
pub mod registry;

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::core::error::NebulaResult;
use crate::core::maven::ArtifactRepository;
use crate::core::module::Module;
use crate::core::tools::Toolchain;
use crate::core::version::MinecraftVersion;

pub use forge::{ForgeGradle2Resolver, ForgeGradle3Resolver};
pub use registry::{select_resolver, select_structure, Strategy, StrategyRegistry, StructureSetup};

/// Everything a resolver needs for one run.
pub struct ResolveContext<'a> {
    pub minecraft_version: &'a MinecraftVersion,
    pub loader_version: &'a str,
    /// Public URL of the distribution root.
    pub base_url: &'a str,
    pub repository: &'a ArtifactRepository,
    pub toolchain: &'a Toolchain,
    /// Scratch space owned by this run.
    pub work_dir: &'a Path,
    pub span: &'a Span,
    pub cancel: &'a CancellationToken,
}

#[async_trait]
pub trait LoaderResolver: Send + Sync {
    async fn resolve(&self, ctx: ResolveContext<'_>) -> NebulaResult<Module>;
}

/// Dispatcher without Box<dyn>.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolver {
    ForgeGradle2(ForgeGradle2Resolver),
    ForgeGradle3(ForgeGradle3Resolver),
}

impl Resolver {
    pub fn name(&self) -> &'static str {
        match self {
            Resolver::ForgeGradle2(_) => "ForgeGradle2",
            Resolver::ForgeGradle3(_) => "ForgeGradle3",
        }
    }

    pub async fn resolve(&self, ctx: ResolveContext<'_>) -> NebulaResult<Module> {
        match self {
            Resolver::ForgeGradle2(r) => r.resolve(ctx).await,
            Resolver::ForgeGradle3(r) => r.resolve(ctx).await,
        }
    }
}
