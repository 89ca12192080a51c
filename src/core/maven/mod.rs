mod artifact;
mod repository;

pub use artifact::MavenArtifact;
pub use repository::ArtifactRepository;

/// Well-known Maven repositories used by the Forge ecosystem.
pub const MOJANG_LIBRARIES: &str = "https://libraries.minecraft.net";
pub const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";

/// Legacy Forge maven host still referenced by old version manifests.
pub const LEGACY_FORGE_MAVEN: &str = "http://files.minecraftforge.net/maven";

/// Url prefix (and directory under the root) of the hosted library repository.
pub const LIBRARY_REPOSITORY_PATH: &str = "repo/lib";
