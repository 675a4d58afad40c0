//! Bot API 的线上数据结构，以及到领域类型的转换

use domain::{
    ButtonAction, CallbackQuery, ChatId, ChatKind, InboundEvent, IncomingMessage, InlineKeyboard,
    MembershipStatus, MessageId, Sender, UserId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
}

impl Chat {
    pub fn chat_kind(&self) -> ChatKind {
        match self.kind.as_str() {
            "group" => ChatKind::Group,
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            _ => ChatKind::Private,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
}

impl Message {
    pub fn into_incoming(self, edited: bool) -> IncomingMessage {
        IncomingMessage {
            chat_id: ChatId(self.chat.id),
            chat_kind: self.chat.chat_kind(),
            message_id: MessageId(self.message_id),
            from: self.from.map(Sender::from),
            // 带说明文字的媒体消息也可能包含链接
            text: self.text.or(self.caption),
            reply_to: self.reply_to_message.map(|m| MessageId(m.message_id)),
            edited,
        }
    }
}

impl From<User> for Sender {
    fn from(user: User) -> Self {
        Sender {
            id: UserId(user.id),
            first_name: user.first_name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQueryPayload {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub edited_message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQueryPayload>,
}

impl Update {
    /// 不关心的更新类型返回 `None`
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(message) = self.message {
            return Some(InboundEvent::Message(message.into_incoming(false)));
        }
        if let Some(message) = self.edited_message {
            return Some(InboundEvent::Message(message.into_incoming(true)));
        }
        self.callback_query.map(|cb| {
            InboundEvent::Callback(CallbackQuery {
                id: cb.id,
                from: cb.from.into(),
                message: cb.message.map(|m| m.into_incoming(false)),
                data: cb.data,
            })
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatMember {
    pub status: String,
}

impl ChatMember {
    pub fn membership(&self) -> Option<MembershipStatus> {
        Some(match self.status.as_str() {
            "creator" => MembershipStatus::Creator,
            "administrator" => MembershipStatus::Administrator,
            "member" => MembershipStatus::Member,
            "restricted" => MembershipStatus::Restricted,
            "left" => MembershipStatus::Left,
            "kicked" => MembershipStatus::Kicked,
            _ => return None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageRef {
    pub message_id: i64,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl From<&InlineKeyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &InlineKeyboard) -> Self {
        let inline_keyboard = keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| {
                        let (url, callback_data) = match &button.action {
                            ButtonAction::Url(url) => (Some(url.clone()), None),
                            ButtonAction::Callback(data) => (None, Some(data.clone())),
                        };
                        InlineKeyboardButton {
                            text: button.text.clone(),
                            url,
                            callback_data,
                        }
                    })
                    .collect()
            })
            .collect();
        Self { inline_keyboard }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::InlineButton;
    use serde_json::json;

    #[test]
    fn edited_message_with_caption_becomes_event() {
        let update: Update = serde_json::from_value(json!({
            "update_id": 9,
            "edited_message": {
                "message_id": 4,
                "chat": {"id": -100, "type": "supergroup", "title": "g"},
                "from": {"id": 7, "is_bot": false, "first_name": "Ann"},
                "caption": "https://instagram.com/reel/abc"
            }
        }))
        .unwrap();

        let Some(InboundEvent::Message(message)) = update.into_event() else {
            panic!("expected a message event");
        };
        assert!(message.edited);
        assert_eq!(message.chat_kind, ChatKind::Supergroup);
        assert_eq!(message.text.as_deref(), Some("https://instagram.com/reel/abc"));
        assert_eq!(message.from.unwrap().id, UserId(7));
    }

    #[test]
    fn unrelated_updates_are_skipped() {
        let update: Update =
            serde_json::from_value(json!({"update_id": 1, "my_chat_member": {}})).unwrap();
        assert!(update.into_event().is_none());
    }

    #[test]
    fn keyboard_serializes_one_action_per_button() {
        let keyboard = InlineKeyboard::new().row(vec![
            InlineButton::callback("Audio", "audio_1"),
            InlineButton::url("Support", "https://t.me/s"),
        ]);
        let value = serde_json::to_value(InlineKeyboardMarkup::from(&keyboard)).unwrap();
        assert_eq!(
            value,
            json!({"inline_keyboard": [[
                {"text": "Audio", "callback_data": "audio_1"},
                {"text": "Support", "url": "https://t.me/s"}
            ]]})
        );
    }

    #[test]
    fn unknown_member_status_is_rejected() {
        let member = ChatMember {
            status: "owner".into(),
        };
        assert_eq!(member.membership(), None);
    }
}
