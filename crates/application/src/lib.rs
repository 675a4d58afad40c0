//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：链接解析与投递、订阅门槛、
//! 受众登记与广播，以及对外部适配器（消息平台、媒体提供方、下载器）的抽象。

pub mod audience;
pub mod broadcast;
pub mod delivery;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod keyboards;
pub mod link_cache;
pub mod platform;
pub mod progress;
pub mod provider;
pub mod services;
pub mod subscription;

#[cfg(test)]
mod testing;

pub use audience::{AudienceError, AudienceStore};
pub use broadcast::{
    BroadcastDispatcher, BroadcastError, BroadcastLock, BroadcastRunHandle,
    DEFAULT_INTER_SEND_DELAY,
};
pub use delivery::{DeliveryError, DeliveryMethod, DeliveryResolver, DeliveryTarget, ScratchFile};
pub use error::ApplicationError;
pub use extractor::{AudioExtractor, ExtractError, ExtractedAudio};
pub use fetcher::{FetchError, MediaFetcher};
pub use keyboards::CommunityLinks;
pub use link_cache::{EphemeralLinkCache, LinkLookup};
pub use platform::{
    AudioUpload, BotProfile, ChatInfo, MediaSource, MessagingPlatform, PlatformError, SentMessage,
    UpdateSource,
};
pub use progress::ProgressMessage;
pub use provider::{ChainError, MediaProvider, ProviderChain, ProviderError};
pub use services::{
    AdminService, AdminServiceDependencies, AudioOutcome, BroadcastCommandOutcome, MediaOutcome,
    MediaService, MediaServiceDependencies, Route, UpdateRouter,
};
pub use subscription::SubscriptionGate;
