//! 媒体请求流水线
//!
//! 入站链接 → 订阅门槛 → 提供方链 → 写入链接缓存 → 投递。
//! 以及依赖链接缓存的"提取音频"回调和"重新检查订阅"回调。

use std::sync::Arc;

use domain::{
    request_key, CallbackQuery, ChatId, ChatKind, GateDecision, IncomingMessage, MediaRequest,
    MessageId, SourceUrl, UnmetRequirement,
};

use crate::{
    delivery::{DeliveryError, DeliveryMethod, DeliveryResolver, DeliveryTarget, ScratchFile},
    error::ApplicationError,
    extractor::AudioExtractor,
    keyboards::{delivery_keyboard, CommunityLinks},
    link_cache::{EphemeralLinkCache, LinkLookup},
    platform::{AudioUpload, MessagingPlatform},
    progress::ProgressMessage,
    provider::ProviderChain,
    subscription::{SubscriptionGate, ACCESS_DENIED_TEXT},
};

const PROCESSING_TEXT: &str = "🔎 Processing your link...";
const SENDING_TEXT: &str = "⏳ Sending video...";
const NOT_FOUND_TEXT: &str = "❌ Sorry, I couldn't download this reel. All providers failed.";
const LINK_EXPIRED_TEXT: &str = "❌ Video URL expired or not found. Please resend the link.";
const NOT_JOINED_TEXT: &str = "❌ You haven't joined yet!";
const JOINED_TEXT: &str = "✅ Thank you for joining! You can now use the bot.";
const AUDIO_PROCESSING_TEXT: &str = "⏳ Processing Audio...";
const AUDIO_EXTRACTING_TEXT: &str = "🎵 Extracting audio, please wait...";
const AUDIO_SENDING_TEXT: &str = "📤 Sending audio...";
const AUDIO_CAPTION: &str = "✅ Audio extracted successfully!";
const AUDIO_PERFORMER: &str = "Instagram";

/// 一次链接请求的结果
#[derive(Debug, Clone, PartialEq)]
pub enum MediaOutcome {
    /// 文本不含受支持的链接
    Ignored,
    /// 未满足订阅门槛，已发送加入提示
    Blocked,
    /// 所有提供方都失败
    NotFound,
    Delivered(DeliveryMethod),
    Failed(DeliveryError),
}

/// 音频回调的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutcome {
    Blocked,
    Expired,
    Sent,
    Failed(String),
}

pub struct MediaServiceDependencies {
    pub platform: Arc<dyn MessagingPlatform>,
    pub gate: Arc<SubscriptionGate>,
    pub chain: ProviderChain,
    pub cache: EphemeralLinkCache,
    pub resolver: DeliveryResolver,
    pub extractor: Arc<dyn AudioExtractor>,
    pub links: CommunityLinks,
}

pub struct MediaService {
    deps: MediaServiceDependencies,
}

impl MediaService {
    pub fn new(deps: MediaServiceDependencies) -> Self {
        Self { deps }
    }

    /// 处理一条可能包含链接的消息
    pub async fn handle_link(
        &self,
        message: &IncomingMessage,
    ) -> Result<MediaOutcome, ApplicationError> {
        let Some(source) = message.text.as_deref().and_then(SourceUrl::find_in) else {
            return Ok(MediaOutcome::Ignored);
        };
        let Some(sender) = &message.from else {
            return Ok(MediaOutcome::Ignored);
        };

        let request = MediaRequest {
            source,
            requester: sender.id,
            chat_id: message.chat_id,
            chat_kind: message.chat_kind,
            message_id: message.message_id,
        };

        if let GateDecision::Blocked(unmet) = self
            .deps
            .gate
            .evaluate(request.requester, request.chat_kind)
            .await
        {
            self.send_join_prompt(request.chat_id, Some(request.message_id), &unmet)
                .await?;
            return Ok(MediaOutcome::Blocked);
        }

        self.process(&request).await
    }

    async fn process(&self, request: &MediaRequest) -> Result<MediaOutcome, ApplicationError> {
        let progress = ProgressMessage::start(
            self.deps.platform.clone(),
            request.chat_id,
            Some(request.message_id),
            PROCESSING_TEXT,
        )
        .await?;

        let locator = match self.deps.chain.resolve(&request.source).await {
            Ok(locator) => locator,
            Err(e) => {
                tracing::warn!(chat_id = %request.chat_id, error = %e, "链接解析失败");
                progress.fail(NOT_FOUND_TEXT).await;
                return Ok(MediaOutcome::NotFound);
            }
        };

        progress.update(SENDING_TEXT).await;
        self.deps
            .cache
            .put(request.request_key(), locator.clone())
            .await;

        let keyboard = delivery_keyboard(request.message_id, &self.deps.links);
        let target = DeliveryTarget {
            chat_id: request.chat_id,
            reply_to: Some(request.message_id),
            scratch_key: request.request_key(),
        };

        match self
            .deps
            .resolver
            .deliver(&locator, &target, Some(&keyboard), Some(&progress))
            .await
        {
            Ok(method) => {
                tracing::info!(chat_id = %request.chat_id, ?method, "视频已发送");
                progress.finish().await;
                Ok(MediaOutcome::Delivered(method))
            }
            Err(e) => {
                tracing::error!(chat_id = %request.chat_id, error = %e, "发送视频失败");
                progress
                    .fail(&format!("❌ Error sending video: {e}"))
                    .await;
                Ok(MediaOutcome::Failed(e))
            }
        }
    }

    /// 处理"提取音频"按钮
    pub async fn handle_audio(
        &self,
        callback: &CallbackQuery,
        request: MessageId,
    ) -> Result<AudioOutcome, ApplicationError> {
        let Some(message) = &callback.message else {
            self.deps
                .platform
                .answer_callback(&callback.id, None, false)
                .await?;
            return Ok(AudioOutcome::Expired);
        };

        if let GateDecision::Blocked(unmet) = self
            .deps
            .gate
            .evaluate(callback.from.id, message.chat_kind)
            .await
        {
            self.send_join_prompt(message.chat_id, None, &unmet).await?;
            self.deps
                .platform
                .answer_callback(&callback.id, None, false)
                .await?;
            return Ok(AudioOutcome::Blocked);
        }

        // 按钮所在会话就是原始请求所在会话
        let key = request_key(message.chat_id, request);
        let locator = match self.deps.cache.get(&key).await {
            LinkLookup::Found(locator) => locator,
            LinkLookup::ExpiredOrUnknown => {
                self.deps
                    .platform
                    .answer_callback(&callback.id, Some(LINK_EXPIRED_TEXT), true)
                    .await?;
                return Ok(AudioOutcome::Expired);
            }
        };

        self.deps
            .platform
            .answer_callback(&callback.id, Some(AUDIO_PROCESSING_TEXT), false)
            .await?;

        let progress = ProgressMessage::start(
            self.deps.platform.clone(),
            message.chat_id,
            Some(message.message_id),
            AUDIO_EXTRACTING_TEXT,
        )
        .await?;

        let audio = match self.deps.extractor.extract(&locator).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::error!(chat_id = %message.chat_id, error = %e, "音频提取失败");
                let reason = e.to_string();
                progress
                    .fail(&format!("❌ Failed to extract audio: {reason}"))
                    .await;
                return Ok(AudioOutcome::Failed(reason));
            }
        };
        let file = ScratchFile::adopt(audio.path.clone());

        progress.update(AUDIO_SENDING_TEXT).await;
        let upload = AudioUpload {
            path: file.path().to_path_buf(),
            title: audio.title,
            performer: AUDIO_PERFORMER.to_string(),
            caption: AUDIO_CAPTION.to_string(),
        };
        let keyboard = self.deps.links.keyboard();

        match self
            .deps
            .platform
            .send_audio(message.chat_id, &upload, keyboard.as_ref())
            .await
        {
            Ok(_) => {
                file.remove().await;
                progress.finish().await;
                Ok(AudioOutcome::Sent)
            }
            Err(e) => {
                file.remove().await;
                tracing::error!(chat_id = %message.chat_id, error = %e, "发送音频失败");
                let reason = e.to_string();
                progress
                    .fail(&format!("❌ Failed to extract audio: {reason}"))
                    .await;
                Ok(AudioOutcome::Failed(reason))
            }
        }
    }

    /// 处理"重新检查订阅"按钮
    pub async fn handle_verify(&self, callback: &CallbackQuery) -> Result<bool, ApplicationError> {
        let chat_kind = callback
            .message
            .as_ref()
            .map(|m| m.chat_kind)
            .unwrap_or(ChatKind::Private);

        match self.deps.gate.evaluate(callback.from.id, chat_kind).await {
            GateDecision::Allowed => {
                if let Some(message) = &callback.message {
                    if let Err(e) = self
                        .deps
                        .platform
                        .delete_message(message.chat_id, message.message_id)
                        .await
                    {
                        tracing::debug!(error = %e, "删除订阅提示失败");
                    }
                    self.deps
                        .platform
                        .send_text(message.chat_id, JOINED_TEXT, None, None)
                        .await?;
                }
                self.deps
                    .platform
                    .answer_callback(&callback.id, None, false)
                    .await?;
                Ok(true)
            }
            GateDecision::Blocked(_) => {
                self.deps
                    .platform
                    .answer_callback(&callback.id, Some(NOT_JOINED_TEXT), true)
                    .await?;
                Ok(false)
            }
        }
    }

    async fn send_join_prompt(
        &self,
        chat_id: ChatId,
        reply_to: Option<MessageId>,
        unmet: &[UnmetRequirement],
    ) -> Result<(), ApplicationError> {
        let keyboard = self.deps.gate.join_keyboard(unmet).await;
        self.deps
            .platform
            .send_text(chat_id, ACCESS_DENIED_TEXT, reply_to, Some(&keyboard))
            .await?;
        Ok(())
    }
}
