//! 短期链接缓存
//!
//! 请求 ID（原始消息 ID）到媒体定位符的映射，供"提取音频"按钮延后使用，
//! 无需重新解析。容量有上限，条目在 TTL 之后过期。

use std::time::Duration;

use domain::MediaLocator;
use moka::future::Cache;

/// 默认保留时间
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(6 * 3600);
/// 默认容量
pub const DEFAULT_LINK_CAPACITY: u64 = 10_000;

/// 查找结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkLookup {
    Found(MediaLocator),
    /// 已过期或从未写入，调用方应提示用户重新发送原链接
    ExpiredOrUnknown,
}

#[derive(Clone)]
pub struct EphemeralLinkCache {
    entries: Cache<String, MediaLocator>,
}

impl EphemeralLinkCache {
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn put(&self, request_id: impl Into<String>, locator: MediaLocator) {
        self.entries.insert(request_id.into(), locator).await;
    }

    pub async fn get(&self, request_id: &str) -> LinkLookup {
        match self.entries.get(request_id).await {
            Some(locator) => LinkLookup::Found(locator),
            None => LinkLookup::ExpiredOrUnknown,
        }
    }
}

impl Default for EphemeralLinkCache {
    fn default() -> Self {
        Self::new(DEFAULT_LINK_TTL, DEFAULT_LINK_CAPACITY)
    }
}
