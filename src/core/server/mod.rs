pub mod manager;
pub mod model;

pub use manager::ServerManager;
pub use model::{ForgeMeta, ServerId, ServerLayout, ServerManifest, ServerMeta, SERVER_META_FILE};
