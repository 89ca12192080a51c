mod model;

pub use model::{Artifact, Module, ModuleType, Required};
