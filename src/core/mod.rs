// ─── Nebula Core ───
// Distribution manifest generator for Minecraft servers.
//
// Architecture:
//   core/
//     module/     : Manifest model (modules, artifacts, required state)
//     maven/      : Coordinates + hosted artifact repository
//     downloader/ : Streaming HTTP transport + checksums
//     process/    : External tool invocation
//     tools/      : Claritas analyzer, PackXZExtract unpacker
//     version/    : Minecraft / Forge version rules
//     structure/  : Directory scanners (forge mods, libraries, files)
//     resolver/   : Forge generations + versioned strategy registry
//     server/     : Server layout + generation entry point

pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod jar;
pub mod maven;
pub mod module;
pub mod process;
pub mod resolver;
pub mod server;
pub mod structure;
pub mod tools;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;
