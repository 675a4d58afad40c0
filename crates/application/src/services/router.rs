//! 入站事件分发：命令、链接消息、按钮回调

use std::sync::Arc;

use domain::{CallbackQuery, InboundEvent, IncomingMessage};

use crate::{
    error::ApplicationError,
    keyboards::parse_audio_callback,
    platform::MessagingPlatform,
    subscription::VERIFY_CALLBACK,
};

use super::{AdminService, MediaService};

/// 一个事件被路由到的处理分支
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Start,
    Stats,
    Broadcast { pin: bool },
    Link,
    VerifySubscription,
    ExtractAudio,
    UnknownCallback,
}

pub struct UpdateRouter {
    platform: Arc<dyn MessagingPlatform>,
    media: Arc<MediaService>,
    admin: Arc<AdminService>,
}

impl UpdateRouter {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        media: Arc<MediaService>,
        admin: Arc<AdminService>,
    ) -> Self {
        Self {
            platform,
            media,
            admin,
        }
    }

    /// 处理单个事件；错误只记录日志，不向上传播
    pub async fn dispatch(&self, event: InboundEvent) -> Route {
        let (route, result) = match &event {
            InboundEvent::Message(message) => self.on_message(message).await,
            InboundEvent::Callback(callback) => self.on_callback(callback).await,
        };

        if let Err(e) = result {
            tracing::error!(route = ?route, error = %e, "处理更新失败");
        }
        route
    }

    async fn on_message(&self, message: &IncomingMessage) -> (Route, Result<(), ApplicationError>) {
        // 编辑过的消息只当作链接处理
        if !message.edited {
            if let Some((name, args)) = message.command() {
                let routed = match name.as_str() {
                    "start" => Some((Route::Start, self.admin.handle_start(message).await)),
                    "stats" => Some((
                        Route::Stats,
                        self.admin.handle_stats(message).await.map(|_| ()),
                    )),
                    "gcast" | "broadcast" => Some((
                        Route::Broadcast { pin: false },
                        self.admin
                            .handle_broadcast(message, args, false)
                            .await
                            .map(|_| ()),
                    )),
                    "gcastpin" | "broadcastpin" => Some((
                        Route::Broadcast { pin: true },
                        self.admin
                            .handle_broadcast(message, args, true)
                            .await
                            .map(|_| ()),
                    )),
                    _ => None,
                };
                if let Some(routed) = routed {
                    return routed;
                }
            }
        }

        (
            Route::Link,
            self.media.handle_link(message).await.map(|outcome| {
                tracing::debug!(chat_id = %message.chat_id, outcome = ?outcome, "链接消息处理完成");
            }),
        )
    }

    async fn on_callback(&self, callback: &CallbackQuery) -> (Route, Result<(), ApplicationError>) {
        let data = callback.data.as_deref().unwrap_or_default();

        if data == VERIFY_CALLBACK {
            return (
                Route::VerifySubscription,
                self.media.handle_verify(callback).await.map(|_| ()),
            );
        }

        if let Some(request) = parse_audio_callback(data) {
            return (
                Route::ExtractAudio,
                self.media.handle_audio(callback, request).await.map(|_| ()),
            );
        }

        tracing::debug!(data, "未知的回调数据");
        let result = self
            .platform
            .answer_callback(&callback.id, None, false)
            .await
            .map_err(ApplicationError::from);
        (Route::UnknownCallback, result)
    }
}
