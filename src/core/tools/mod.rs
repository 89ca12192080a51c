pub mod claritas;
pub mod pack_xz;

use std::path::PathBuf;
use std::sync::Arc;

pub use claritas::{
    ClaritasException, ClaritasModuleMetadata, ClaritasResult, ClaritasWrapper, LibraryType,
};
pub use pack_xz::{unpacked_path, PackOperation, PackXzExtract};

use crate::core::config::GeneratorConfig;
use crate::core::process::ProcessRunner;

/// External programs available to one generation run.
pub struct Toolchain {
    pub java: PathBuf,
    pub runner: Arc<dyn ProcessRunner>,
    pub claritas: Option<ClaritasWrapper>,
    pub pack_xz: PackXzExtract,
    pub headless_installer: bool,
}

impl Toolchain {
    pub fn from_config(config: &GeneratorConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        let java = config.java_executable.clone();
        let claritas = config.claritas_jar.as_ref().map(|jar| {
            ClaritasWrapper::new(
                java.clone(),
                jar.clone(),
                config.work_dir().join("claritas"),
                runner.clone(),
            )
        });
        let pack_xz = PackXzExtract::new(
            java.clone(),
            config.pack_xz_extract_jar.clone(),
            runner.clone(),
        );

        Self {
            java,
            runner,
            claritas,
            pack_xz,
            headless_installer: config.headless_installer,
        }
    }
}
