//! 基础设施层实现。
//!
//! 提供 Bot API 客户端、媒体提供方、下载器、受众存储与音频提取等适配器，
//! 实现应用层定义的接口。

pub mod audience;
pub mod builder;
pub mod fetcher;
pub mod providers;
pub mod telegram;
pub mod ytdlp;

pub use audience::RedisAudienceStore;
pub use builder::{Infrastructure, InfrastructureError};
pub use fetcher::HttpMediaFetcher;
pub use providers::{build_providers, DurgeshProvider, HazexProvider};
pub use telegram::BotApiClient;
pub use ytdlp::YtDlpExtractor;
