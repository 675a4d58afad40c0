use std::path::Path;

use async_trait::async_trait;
use domain::MediaLocator;
use thiserror::Error;

/// 下载媒体字节失败
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// 远端返回非成功状态码
    #[error("download returned HTTP {0}")]
    Status(u16),

    #[error("download failed: {0}")]
    Transport(String),

    #[error("cannot write scratch file: {0}")]
    Io(String),
}

/// 把远程媒体完整下载到本地文件
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// 返回写入的字节数
    async fn fetch_to_file(&self, locator: &MediaLocator, dest: &Path) -> Result<u64, FetchError>;
}
