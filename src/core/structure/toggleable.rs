use std::path::Path;

use crate::core::error::{NebulaError, NebulaResult};
use crate::core::module::{Module, Required};

/// Subdirectory of a toggleable structure that decides a module's required
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleableNamespace {
    Required,
    OptionalOn,
    OptionalOff,
}

impl ToggleableNamespace {
    pub const ALL: [ToggleableNamespace; 3] = [
        ToggleableNamespace::Required,
        ToggleableNamespace::OptionalOn,
        ToggleableNamespace::OptionalOff,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            ToggleableNamespace::Required => "required",
            ToggleableNamespace::OptionalOn => "optionalon",
            ToggleableNamespace::OptionalOff => "optionaloff",
        }
    }

    /// Override written into modules found under this namespace.
    pub fn required(&self) -> Option<Required> {
        match self {
            ToggleableNamespace::Required => None,
            // Launchers default optional modules to enabled.
            ToggleableNamespace::OptionalOn => Some(Required {
                value: Some(false),
                def: None,
            }),
            ToggleableNamespace::OptionalOff => Some(Required {
                value: Some(false),
                def: Some(false),
            }),
        }
    }

    pub fn apply(&self, module: &mut Module) {
        module.required = self.required();
    }
}

/// Create every namespace directory under `container_dir`.
pub async fn init_namespaces(container_dir: &Path) -> NebulaResult<()> {
    for namespace in ToggleableNamespace::ALL {
        let dir = container_dir.join(namespace.dir_name());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| NebulaError::io(&dir, e))?;
    }
    Ok(())
}
