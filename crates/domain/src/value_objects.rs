use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// 用户唯一标识（平台分配的正整数）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<UserId> for i64 {
    fn from(value: UserId) -> Self {
        value.0
    }
}

/// 会话唯一标识。
///
/// 私聊会话与用户 ID 相同（正数），群组和频道为负数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl ChatId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// 是否为群组/频道会话
    pub fn is_group(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<UserId> for ChatId {
    fn from(value: UserId) -> Self {
        Self(value.0)
    }
}

impl FromStr for ChatId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| DomainError::validation_error("chat_id", format!("非法会话ID: {s}")))
    }
}

/// 会话内消息唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl FromStr for MessageId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(MessageId)
            .map_err(|_| DomainError::validation_error("message_id", format!("非法消息ID: {s}")))
    }
}

/// 会话类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_private(&self) -> bool {
        matches!(self, ChatKind::Private)
    }

    /// 群组会话会被登记到受众的会话集合中
    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

/// 指向一个会话的引用：数字 ID 或公开用户名（`@name`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatRef {
    Id(ChatId),
    Username(String),
}

impl ChatRef {
    /// 解析配置中的会话引用，数字按 ID 处理，其余按用户名处理
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::validation_error("chat", "会话引用不能为空"));
        }
        if let Ok(id) = raw.parse::<ChatId>() {
            return Ok(ChatRef::Id(id));
        }
        let name = raw.trim_start_matches('@');
        if name.is_empty() {
            return Err(DomainError::validation_error("chat", format!("非法用户名: {raw}")));
        }
        Ok(ChatRef::Username(format!("@{name}")))
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{id}"),
            ChatRef::Username(name) => write!(f, "{name}"),
        }
    }
}

impl From<ChatId> for ChatRef {
    fn from(value: ChatId) -> Self {
        ChatRef::Id(value)
    }
}
