//! 媒体下载：把远程文件按流写入本地

use std::path::Path;

use application::{FetchError, MediaFetcher};
use async_trait::async_trait;
use domain::MediaLocator;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch_to_file(&self, locator: &MediaLocator, dest: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(locator.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::Transport(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| FetchError::Io(e.to_string()))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| FetchError::Io(e.to_string()))?;

        tracing::debug!(path = %dest.display(), bytes = written, "媒体已下载到本地");
        Ok(written)
    }
}
