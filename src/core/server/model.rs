use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{NebulaError, NebulaResult};
use crate::core::module::Module;
use crate::core::structure::forgemod::DIR_NAME as FORGE_MODS_DIR;
use crate::core::structure::{FileStructure, LibraryStructure, UntrackedFilesOption};
use crate::core::version::MinecraftVersion;

pub const SERVER_META_FILE: &str = "servermeta.json";

/// `<name>-<minecraft version>`, the directory name of a server under
/// `servers/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerId {
    pub name: String,
    pub minecraft_version: MinecraftVersion,
}

impl ServerId {
    pub fn new(name: &str, minecraft_version: MinecraftVersion) -> NebulaResult<Self> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(NebulaError::Other(format!("Invalid server name {name:?}")));
        }
        Ok(Self {
            name: name.to_string(),
            minecraft_version,
        })
    }

    /// Split at the last `-`: `My-Pack-1.12.2` is `My-Pack` on 1.12.2.
    pub fn parse(raw: &str) -> NebulaResult<Self> {
        let (name, version) = raw
            .rsplit_once('-')
            .ok_or_else(|| NebulaError::Other(format!("Server id {raw:?} lacks a -<version> suffix")))?;
        Self::new(name, MinecraftVersion::parse(version)?)
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.minecraft_version)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForgeMeta {
    pub version: String,
}

/// Per-server settings persisted as `servermeta.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forge: Option<ForgeMeta>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub untracked_files: Vec<UntrackedFilesOption>,
}

/// On-disk layout of one server.
///
/// - `forgemods/{required,optionalon,optionaloff}/`
/// - `libraries/`
/// - `files/`
/// - `servermeta.json`
#[derive(Debug, Clone)]
pub struct ServerLayout {
    pub id: ServerId,
    pub path: PathBuf,
}

impl ServerLayout {
    pub fn new(servers_dir: &Path, id: ServerId) -> Self {
        let path = servers_dir.join(id.to_string());
        Self { id, path }
    }

    pub fn forge_mods_dir(&self) -> PathBuf {
        self.path.join(FORGE_MODS_DIR)
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.path.join(LibraryStructure::DIR_NAME)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.path.join(FileStructure::DIR_NAME)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.path.join(SERVER_META_FILE)
    }

    /// URL path of a structure directory below the distribution root.
    pub fn relative_root(&self, dir_name: &str) -> String {
        format!("servers/{}/{}", self.id, dir_name)
    }
}

/// Generated distribution entry of one server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerManifest {
    pub id: String,
    pub minecraft_version: String,
    pub modules: Vec<Module>,
}
