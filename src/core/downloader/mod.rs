mod checksum;
mod client;

pub use checksum::{md5_file, sha1_file};
pub use client::{Downloader, Transport};
