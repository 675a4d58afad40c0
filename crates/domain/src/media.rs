//! 媒体请求相关的值对象
//!
//! 包含来源链接的匹配与校验、一次解析请求的上下文，以及解析得到的媒体定位符。

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatId, ChatKind, MessageId, UserId};

/// 来源链接格式：协议可省略，域名白名单，路径中包含媒体类型与短码，后续参数忽略。
pub const SOURCE_URL_PATTERN: &str =
    r"^(?:https?://)?(?:www\.)?(?:instagram\.com|instagr\.am)/(p|reel|tv)/([^/?#&\s]+)\S*";

static SOURCE_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(SOURCE_URL_PATTERN).expect("source url pattern is valid"));

/// 来源链接中的媒体类型段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Post,
    Reel,
    Tv,
}

impl MediaKind {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "p" => Some(MediaKind::Post),
            "reel" => Some(MediaKind::Reel),
            "tv" => Some(MediaKind::Tv),
            _ => None,
        }
    }
}

/// 经过格式校验的来源链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUrl {
    url: String,
    kind: MediaKind,
    shortcode: String,
}

impl SourceUrl {
    /// 校验整段文本是否为受支持的链接
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        Self::find_in(raw).ok_or_else(|| DomainError::UnsupportedLink(raw.to_string()))
    }

    /// 从消息文本开头提取链接，不匹配时返回 `None`
    pub fn find_in(text: &str) -> Option<Self> {
        let caps = SOURCE_URL_RE.captures(text)?;
        let whole = caps.get(0)?.as_str();
        let kind = MediaKind::from_segment(caps.get(1)?.as_str())?;
        let shortcode = caps.get(2)?.as_str().to_string();

        Some(Self {
            url: whole.to_string(),
            kind,
            shortcode,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn shortcode(&self) -> &str {
        &self.shortcode
    }
}

impl fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// 可播放媒体的远程地址
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaLocator(String);

impl MediaLocator {
    /// 只接受非空的 http(s) 地址
    pub fn parse(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation_error("locator", "媒体地址为空"));
        }
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(DomainError::validation_error(
                "locator",
                format!("媒体地址不是 http(s) 链接: {trimmed}"),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次媒体解析请求，生命周期等同于一次解析尝试
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub source: SourceUrl,
    pub requester: UserId,
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub message_id: MessageId,
}

impl MediaRequest {
    /// 缓存与临时文件共用的键
    pub fn request_key(&self) -> String {
        request_key(self.chat_id, self.message_id)
    }
}

/// 消息 ID 只在单个会话内唯一，键必须带上会话 ID
pub fn request_key(chat_id: ChatId, message_id: MessageId) -> String {
    format!("{chat_id}_{message_id}")
}
