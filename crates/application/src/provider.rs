//! 内容提供方与故障转移链
//!
//! 每个提供方只有一次尝试机会；任何错误都视为该提供方放弃，链条继续尝试下一个。

use std::sync::Arc;

use async_trait::async_trait;
use domain::{MediaLocator, SourceUrl};
use thiserror::Error;

/// 单个提供方放弃的原因
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    /// 响应格式正确但未满足该提供方的成功约定
    #[error("provider declined: {0}")]
    Declined(String),
}

/// 内容提供方能力
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// 日志中使用的名字
    fn name(&self) -> &'static str;

    /// 针对一个来源链接发起一次解析
    async fn attempt_resolve(&self, source: &SourceUrl) -> Result<MediaLocator, ProviderError>;
}

/// 所有提供方都放弃
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChainError {
    #[error("no provider could resolve {source_url} ({attempted} attempted)")]
    NotFound { source_url: String, attempted: usize },
}

/// 有序的提供方链
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn MediaProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn MediaProvider>>) -> Self {
        Self { providers }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// 按固定顺序逐个尝试，返回第一个成功的定位符
    pub async fn resolve(&self, source: &SourceUrl) -> Result<MediaLocator, ChainError> {
        for (index, provider) in self.providers.iter().enumerate() {
            if index == 0 {
                tracing::info!(provider = provider.name(), source = %source, "尝试解析链接");
            } else {
                tracing::info!(provider = provider.name(), source = %source, "切换到备用提供方");
            }

            match provider.attempt_resolve(source).await {
                Ok(locator) => {
                    tracing::debug!(provider = provider.name(), locator = %locator, "解析成功");
                    return Ok(locator);
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "提供方解析失败");
                }
            }
        }

        Err(ChainError::NotFound {
            source_url: source.to_string(),
            attempted: self.providers.len(),
        })
    }
}
