use std::path::Path;

use md5::Md5;
use sha1::{Digest, Sha1};
use tokio::io::AsyncReadExt;

use crate::core::error::{NebulaError, NebulaResult};

const READ_BUFFER: usize = 64 * 1024;

async fn digest_file<D: Digest>(path: &Path) -> NebulaResult<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| NebulaError::io(path, e))?;

    let mut hasher = D::new();
    let mut buf = vec![0u8; READ_BUFFER];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| NebulaError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Lowercase hex MD5 of a file, the hash published in module artifacts.
pub async fn md5_file(path: &Path) -> NebulaResult<String> {
    digest_file::<Md5>(path).await
}

/// Lowercase hex SHA-1 of a file, the hash Forge manifests declare.
pub async fn sha1_file(path: &Path) -> NebulaResult<String> {
    digest_file::<Sha1>(path).await
}
