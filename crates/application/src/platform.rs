//! 消息平台能力接口
//!
//! 平台客户端（登录、收发消息、成员查询）是外部协作方，这里只定义
//! 核心流程需要的能力调用及其错误面。

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use domain::{
    ChatId, ChatRef, InboundEvent, InlineKeyboard, MediaLocator, MembershipStatus, MessageId,
    UserId,
};
use thiserror::Error;

/// 平台调用错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlatformError {
    /// 平台要求等待后重试
    #[error("rate limited, retry after {}s", retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    /// 接收方不可达（拉黑、ID 无效、编辑内容未变化）
    #[error("recipient unreachable: {0}")]
    RecipientUnreachable(String),

    /// 平台返回的其它业务错误
    #[error("platform api error: {0}")]
    Api(String),

    /// 网络或协议错误
    #[error("transport error: {0}")]
    Transport(String),
}

impl PlatformError {
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api(message.into())
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::RecipientUnreachable(message.into())
    }
}

/// 视频来源：远程地址交给平台自行拉取，或上传本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Remote(MediaLocator),
    LocalFile(PathBuf),
}

/// 待上传的音频
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    pub path: PathBuf,
    pub title: String,
    pub performer: String,
    pub caption: String,
}

/// 平台回执
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// 会话元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatInfo {
    pub title: Option<String>,
    pub username: Option<String>,
    pub invite_link: Option<String>,
}

impl ChatInfo {
    /// 邀请链接优先，其次是公开用户名链接
    pub fn join_url(&self) -> Option<String> {
        self.invite_link
            .clone()
            .or_else(|| self.username.as_ref().map(|u| format!("https://t.me/{u}")))
    }
}

/// 机器人自身信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotProfile {
    pub id: UserId,
    pub username: String,
}

/// 消息平台能力
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    async fn get_me(&self) -> Result<BotProfile, PlatformError>;

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError>;

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: &MediaSource,
        reply_to: Option<MessageId>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError>;

    async fn send_audio(
        &self,
        chat_id: ChatId,
        audio: &AudioUpload,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError>;

    /// 把 `from_chat` 中的消息复制到 `chat_id`
    async fn copy_message(
        &self,
        chat_id: ChatId,
        from_chat: ChatId,
        message_id: MessageId,
    ) -> Result<SentMessage, PlatformError>;

    async fn pin_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        disable_notification: bool,
    ) -> Result<(), PlatformError>;

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), PlatformError>;

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), PlatformError>;

    async fn get_chat_member(
        &self,
        chat: &ChatRef,
        user_id: UserId,
    ) -> Result<MembershipStatus, PlatformError>;

    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo, PlatformError>;

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), PlatformError>;
}

/// 入站事件来源（长轮询等）
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// 拉取下一批事件，没有新事件时返回空列表
    async fn poll(&self) -> Result<Vec<InboundEvent>, PlatformError>;
}
