use std::sync::Arc;

use domain::{ChatId, MessageId};

use crate::platform::{MessagingPlatform, PlatformError};

/// 请求进度消息
///
/// 每个请求只创建一条；结束时要么删除（成功），要么改写为错误描述（失败）。
pub struct ProgressMessage {
    platform: Arc<dyn MessagingPlatform>,
    chat_id: ChatId,
    message_id: MessageId,
    settled: bool,
}

impl ProgressMessage {
    /// 发送初始进度消息
    pub async fn start(
        platform: Arc<dyn MessagingPlatform>,
        chat_id: ChatId,
        reply_to: Option<MessageId>,
        text: &str,
    ) -> Result<Self, PlatformError> {
        let sent = platform.send_text(chat_id, text, reply_to, None).await?;
        Ok(Self {
            platform,
            chat_id,
            message_id: sent.message_id,
            settled: false,
        })
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// 更新中间状态，失败只记录日志
    pub async fn update(&self, text: &str) {
        if let Err(e) = self
            .platform
            .edit_text(self.chat_id, self.message_id, text)
            .await
        {
            tracing::debug!(chat_id = %self.chat_id, error = %e, "更新进度消息失败");
        }
    }

    /// 成功结束：删除进度消息
    pub async fn finish(mut self) {
        self.settled = true;
        if let Err(e) = self
            .platform
            .delete_message(self.chat_id, self.message_id)
            .await
        {
            tracing::warn!(chat_id = %self.chat_id, error = %e, "删除进度消息失败");
        }
    }

    /// 失败结束：改写为错误描述
    pub async fn fail(mut self, text: &str) {
        self.settled = true;
        if let Err(e) = self
            .platform
            .edit_text(self.chat_id, self.message_id, text)
            .await
        {
            tracing::warn!(chat_id = %self.chat_id, error = %e, "写入失败原因到进度消息失败");
        }
    }
}

impl Drop for ProgressMessage {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(
                chat_id = %self.chat_id,
                message_id = %self.message_id,
                "进度消息未被结束"
            );
        }
    }
}
