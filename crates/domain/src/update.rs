//! 平台推送给机器人的入站事件

use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatId, ChatKind, MessageId, UserId};

/// 消息发送者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: UserId,
    pub first_name: String,
}

/// 入站消息（新消息或编辑后的消息）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub message_id: MessageId,
    pub from: Option<Sender>,
    pub text: Option<String>,
    pub reply_to: Option<MessageId>,
    pub edited: bool,
}

impl IncomingMessage {
    /// 解析 `/command@bot args` 形式的命令，返回小写命令名与参数
    pub fn command(&self) -> Option<(String, Option<&str>)> {
        let text = self.text.as_deref()?.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, Some(args.trim()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };
        let name = head.split('@').next().unwrap_or(head);
        if name.is_empty() {
            return None;
        }
        Some((name.to_ascii_lowercase(), args))
    }
}

/// 内联按钮回调
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: Sender,
    /// 按钮所在的消息
    pub message: Option<IncomingMessage>,
    pub data: Option<String>,
}

/// 入站事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    Message(IncomingMessage),
    Callback(CallbackQuery),
}
