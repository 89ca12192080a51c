pub mod crude;
pub mod discovery;
pub mod file;
pub mod forgemod;
pub mod library;
pub mod module_structure;
pub mod toggleable;
pub mod untracked;

pub use discovery::ModuleCandidate;
pub use file::FileStructure;
pub use forgemod::{LegacyForgeModStructure, ModernForgeModStructure};
pub use library::LibraryStructure;
pub use module_structure::{
    maven_identifier, resolve_modules, ModuleIdentity, ModuleStructure, StructureRoot,
};
pub use toggleable::{init_namespaces, ToggleableNamespace};
pub use untracked::{UntrackedFilesOption, UntrackedMatcher};
