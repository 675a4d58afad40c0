use std::path::PathBuf;

use async_trait::async_trait;
use domain::MediaLocator;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractError {
    #[error("audio extraction failed: {0}")]
    Failed(String),

    #[error("io error: {0}")]
    Io(String),
}

/// 提取结果：本地音频文件及其标题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedAudio {
    pub path: PathBuf,
    pub title: String,
}

/// 音频提取（转码）能力：输入媒体地址，输出本地文件
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, locator: &MediaLocator) -> Result<ExtractedAudio, ExtractError>;
}
