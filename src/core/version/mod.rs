pub mod forge;
pub mod minecraft;

pub use forge::{forge_artifact_version, forge_version_manifest_id, is_forge_gradle3};
pub use minecraft::MinecraftVersion;
