//! 广播相关的领域模型

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ChatId, MessageId};

/// 广播内容：复制一条已有消息，或发送一段文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastPayload {
    Copy {
        from_chat: ChatId,
        message_id: MessageId,
    },
    Text(String),
}

impl BroadcastPayload {
    /// 从命令上下文构造广播内容
    ///
    /// 回复的消息优先于命令参数；两者都没有时返回错误。
    pub fn from_command(
        reply: Option<(ChatId, MessageId)>,
        text: Option<&str>,
    ) -> Result<Self, DomainError> {
        if let Some((from_chat, message_id)) = reply {
            return Ok(BroadcastPayload::Copy {
                from_chat,
                message_id,
            });
        }

        match text.map(str::trim) {
            Some(text) if !text.is_empty() => Ok(BroadcastPayload::Text(text.to_string())),
            _ => Err(DomainError::validation_error(
                "payload",
                "Provide text or reply to a message to broadcast.",
            )),
        }
    }
}

/// 去重后的广播目标，保持首次出现的顺序（会话在前，用户在后）
pub fn dedup_audience(chats: &[ChatId], users: &[ChatId]) -> Vec<ChatId> {
    let mut seen = HashSet::with_capacity(chats.len() + users.len());
    chats
        .iter()
        .chain(users.iter())
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// 一次广播的结果汇总
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastSummary {
    pub success: u64,
    pub failed: u64,
}

impl BroadcastSummary {
    pub fn total(&self) -> u64 {
        self.success + self.failed
    }
}
