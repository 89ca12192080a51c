use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{NebulaError, NebulaResult};
use crate::core::http::build_http_client;

/// The two HTTP operations the artifact repository needs.
///
/// Implemented by [`Downloader`] over reqwest; tests substitute an in-memory
/// fake so no network is touched.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Stream `url` into `dest`, returning the number of bytes written.
    /// `dest`'s parent directory must already exist.
    async fn fetch(&self, url: &str, dest: &Path) -> NebulaResult<u64>;

    /// Issue a HEAD request and report whether the remote answered 2xx.
    async fn head(&self, url: &str) -> NebulaResult<bool>;
}

/// Streaming HTTP downloader.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> NebulaResult<Self> {
        Ok(Self {
            client: build_http_client()?,
        })
    }
}

#[async_trait]
impl Transport for Downloader {
    async fn fetch(&self, url: &str, dest: &Path) -> NebulaResult<u64> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NebulaError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut written = 0u64;
        // Write inside a block so the handle is closed before the caller
        // hashes or moves the file.
        {
            let mut file = tokio::fs::File::create(dest)
                .await
                .map_err(|e| NebulaError::io(dest, e))?;

            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| NebulaError::io(dest, e))?;
                written += chunk.len() as u64;
            }

            file.flush().await.map_err(|e| NebulaError::io(dest, e))?;
        }

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }

    async fn head(&self, url: &str) -> NebulaResult<bool> {
        let response = self.client.head(url).send().await?;
        Ok(response.status().is_success())
    }
}
