use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use application::{
    AudioUpload, BotProfile, ChatInfo, MediaSource, MessagingPlatform, PlatformError, SentMessage,
    UpdateSource,
};
use async_trait::async_trait;
use domain::{ChatId, ChatRef, InboundEvent, InlineKeyboard, MembershipStatus, MessageId, UserId};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::types::{
    ApiResponse, Chat, ChatMember, InlineKeyboardMarkup, Message, MessageRef, Update, User,
};

/// 这些错误描述说明接收方已不可达，重试没有意义
const UNREACHABLE_DESCRIPTIONS: [&str; 4] = [
    "chat not found",
    "PEER_ID_INVALID",
    "user is deactivated",
    "message is not modified",
];

/// 长轮询之外额外留给网络的时间
const POLL_GRACE: Duration = Duration::from_secs(10);

/// 把 Bot API 的失败响应映射为平台错误
pub fn map_api_error(
    error_code: Option<i64>,
    description: &str,
    retry_after: Option<u64>,
) -> PlatformError {
    match (error_code, retry_after) {
        (Some(429), Some(secs)) => PlatformError::RateLimited {
            retry_after: Duration::from_secs(secs),
        },
        (Some(403), _) => PlatformError::unreachable(description),
        (Some(400), _)
            if UNREACHABLE_DESCRIPTIONS
                .iter()
                .any(|needle| description.contains(needle)) =>
        {
            PlatformError::unreachable(description)
        }
        (code, _) => PlatformError::api(format!(
            "{} ({})",
            description,
            code.map(|c| c.to_string()).unwrap_or_else(|| "no code".into())
        )),
    }
}

fn chat_ref_value(chat: &ChatRef) -> Value {
    match chat {
        ChatRef::Id(id) => json!(id.0),
        ChatRef::Username(name) => json!(name),
    }
}

fn sent(message: Message) -> SentMessage {
    SentMessage {
        chat_id: ChatId(message.chat.id),
        message_id: MessageId(message.message_id),
    }
}

/// Telegram Bot API 客户端
pub struct BotApiClient {
    http: reqwest::Client,
    endpoint: String,
    poll_timeout: Duration,
    offset: AtomicI64,
}

impl BotApiClient {
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        token: &str,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoint: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
            poll_timeout,
            offset: AtomicI64::new(0),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.endpoint, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, PlatformError> {
        let response = self
            .http
            .post(self.url(method))
            .json(&params)
            .send()
            .await
            .map_err(|e| PlatformError::transport(format!("{method}: {e}")))?;
        Self::decode(method, response).await
    }

    async fn upload<T: DeserializeOwned>(
        &self,
        method: &str,
        form: Form,
    ) -> Result<T, PlatformError> {
        let response = self
            .http
            .post(self.url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PlatformError::transport(format!("{method}: {e}")))?;
        Self::decode(method, response).await
    }

    async fn decode<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, PlatformError> {
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PlatformError::transport(format!("{method}: {e}")))?;

        let parsed: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            PlatformError::transport(format!("{method}: HTTP {}: {e}", status.as_u16()))
        })?;

        if parsed.ok {
            return parsed
                .result
                .ok_or_else(|| PlatformError::api(format!("{method}: response without result")));
        }

        let error = map_api_error(
            parsed.error_code,
            parsed.description.as_deref().unwrap_or_default(),
            parsed.parameters.and_then(|p| p.retry_after),
        );
        tracing::debug!(method, error = %error, "Bot API 调用失败");
        Err(error)
    }

    /// 以流的方式上传本地文件，不整体读入内存
    async fn file_part(path: &Path, mime: &str) -> Result<Part, PlatformError> {
        let cannot_read = |e: std::io::Error| {
            PlatformError::transport(format!("cannot read {}: {e}", path.display()))
        };
        let file = tokio::fs::File::open(path).await.map_err(cannot_read)?;
        let length = file.metadata().await.map_err(cannot_read)?.len();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Part::stream_with_length(reqwest::Body::from(file), length)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| PlatformError::transport(e.to_string()))
    }

    fn with_reply(
        mut params: Value,
        reply_to: Option<MessageId>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Value {
        if let Some(id) = reply_to {
            params["reply_to_message_id"] = json!(id.0);
            params["allow_sending_without_reply"] = json!(true);
        }
        if let Some(keyboard) = keyboard {
            params["reply_markup"] = json!(InlineKeyboardMarkup::from(keyboard));
        }
        params
    }

    fn form_with_reply(
        mut form: Form,
        reply_to: Option<MessageId>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<Form, PlatformError> {
        if let Some(id) = reply_to {
            form = form
                .text("reply_to_message_id", id.to_string())
                .text("allow_sending_without_reply", "true");
        }
        if let Some(keyboard) = keyboard {
            let markup = serde_json::to_string(&InlineKeyboardMarkup::from(keyboard))
                .map_err(|e| PlatformError::api(e.to_string()))?;
            form = form.text("reply_markup", markup);
        }
        Ok(form)
    }
}

#[async_trait]
impl MessagingPlatform for BotApiClient {
    async fn get_me(&self) -> Result<BotProfile, PlatformError> {
        let user: User = self.call("getMe", json!({})).await?;
        Ok(BotProfile {
            id: UserId(user.id),
            username: user.username.unwrap_or_default(),
        })
    }

    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError> {
        let params = Self::with_reply(
            json!({"chat_id": chat_id.0, "text": text, "disable_web_page_preview": true}),
            reply_to,
            keyboard,
        );
        let message: Message = self.call("sendMessage", params).await?;
        Ok(sent(message))
    }

    async fn send_video(
        &self,
        chat_id: ChatId,
        video: &MediaSource,
        reply_to: Option<MessageId>,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError> {
        let message: Message = match video {
            MediaSource::Remote(locator) => {
                let params = Self::with_reply(
                    json!({
                        "chat_id": chat_id.0,
                        "video": locator.as_str(),
                        "supports_streaming": true,
                    }),
                    reply_to,
                    keyboard,
                );
                self.call("sendVideo", params).await?
            }
            MediaSource::LocalFile(path) => {
                let form = Form::new()
                    .text("chat_id", chat_id.to_string())
                    .text("supports_streaming", "true")
                    .part("video", Self::file_part(path, "video/mp4").await?);
                let form = Self::form_with_reply(form, reply_to, keyboard)?;
                self.upload("sendVideo", form).await?
            }
        };
        Ok(sent(message))
    }

    async fn send_audio(
        &self,
        chat_id: ChatId,
        audio: &AudioUpload,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<SentMessage, PlatformError> {
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("title", audio.title.clone())
            .text("performer", audio.performer.clone())
            .text("caption", audio.caption.clone())
            .part("audio", Self::file_part(&audio.path, "audio/mpeg").await?);
        let form = Self::form_with_reply(form, None, keyboard)?;
        let message: Message = self.upload("sendAudio", form).await?;
        Ok(sent(message))
    }

    async fn copy_message(
        &self,
        chat_id: ChatId,
        from_chat: ChatId,
        message_id: MessageId,
    ) -> Result<SentMessage, PlatformError> {
        let copied: MessageRef = self
            .call(
                "copyMessage",
                json!({
                    "chat_id": chat_id.0,
                    "from_chat_id": from_chat.0,
                    "message_id": message_id.0,
                }),
            )
            .await?;
        Ok(SentMessage {
            chat_id,
            message_id: MessageId(copied.message_id),
        })
    }

    async fn pin_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        disable_notification: bool,
    ) -> Result<(), PlatformError> {
        let _: bool = self
            .call(
                "pinChatMessage",
                json!({
                    "chat_id": chat_id.0,
                    "message_id": message_id.0,
                    "disable_notification": disable_notification,
                }),
            )
            .await?;
        Ok(())
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<(), PlatformError> {
        // 结果可能是消息对象也可能是 true
        let _: Value = self
            .call(
                "editMessageText",
                json!({"chat_id": chat_id.0, "message_id": message_id.0, "text": text}),
            )
            .await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<(), PlatformError> {
        let _: bool = self
            .call(
                "deleteMessage",
                json!({"chat_id": chat_id.0, "message_id": message_id.0}),
            )
            .await?;
        Ok(())
    }

    async fn get_chat_member(
        &self,
        chat: &ChatRef,
        user_id: UserId,
    ) -> Result<MembershipStatus, PlatformError> {
        let member: ChatMember = self
            .call(
                "getChatMember",
                json!({"chat_id": chat_ref_value(chat), "user_id": user_id.0}),
            )
            .await?;
        member
            .membership()
            .ok_or_else(|| PlatformError::api(format!("unknown member status: {}", member.status)))
    }

    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo, PlatformError> {
        let chat: Chat = self
            .call("getChat", json!({"chat_id": chat_ref_value(chat)}))
            .await?;
        Ok(ChatInfo {
            title: chat.title,
            username: chat.username,
            invite_link: chat.invite_link,
        })
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), PlatformError> {
        let mut params = json!({"callback_query_id": callback_id, "show_alert": show_alert});
        if let Some(text) = text {
            params["text"] = json!(text);
        }
        let _: bool = self.call("answerCallbackQuery", params).await?;
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for BotApiClient {
    async fn poll(&self) -> Result<Vec<InboundEvent>, PlatformError> {
        let params = json!({
            "offset": self.offset.load(Ordering::Acquire),
            "timeout": self.poll_timeout.as_secs(),
            "allowed_updates": ["message", "edited_message", "callback_query"],
        });
        let response = self
            .http
            .post(self.url("getUpdates"))
            .timeout(self.poll_timeout + POLL_GRACE)
            .json(&params)
            .send()
            .await
            .map_err(|e| PlatformError::transport(format!("getUpdates: {e}")))?;
        let updates: Vec<Update> = Self::decode("getUpdates", response).await?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.store(last + 1, Ordering::Release);
        }
        Ok(updates.into_iter().filter_map(Update::into_event).collect())
    }
}
