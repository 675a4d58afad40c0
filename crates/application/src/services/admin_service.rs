//! 受众登记与运营命令（统计、广播）

use std::collections::HashSet;
use std::sync::Arc;

use domain::{BroadcastPayload, BroadcastSummary, IncomingMessage, UserId};

use crate::{
    audience::AudienceStore,
    broadcast::{BroadcastDispatcher, BroadcastError},
    error::ApplicationError,
    keyboards::{welcome_keyboard, CommunityLinks},
    platform::MessagingPlatform,
};

const BROADCAST_BUSY_TEXT: &str = "⚠️ A broadcast is already in progress.";
const BROADCAST_PANEL_TEXT: &str = "📣 Broadcasting Message...";

/// 广播命令的执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastCommandOutcome {
    /// 发送者不在运营名单中，静默忽略
    Unauthorized,
    AlreadyInProgress,
    MissingPayload,
    Completed(BroadcastSummary),
    Failed(BroadcastError),
}

pub struct AdminServiceDependencies {
    pub platform: Arc<dyn MessagingPlatform>,
    pub audience: Arc<dyn AudienceStore>,
    pub dispatcher: Arc<BroadcastDispatcher>,
    pub operators: HashSet<UserId>,
    pub links: CommunityLinks,
}

pub struct AdminService {
    deps: AdminServiceDependencies,
}

impl AdminService {
    pub fn new(deps: AdminServiceDependencies) -> Self {
        Self { deps }
    }

    pub fn is_operator(&self, user_id: UserId) -> bool {
        self.deps.operators.contains(&user_id)
    }

    /// /start：登记受众并回复欢迎语
    pub async fn handle_start(&self, message: &IncomingMessage) -> Result<(), ApplicationError> {
        let Some(sender) = &message.from else {
            return Ok(());
        };

        // 登记失败不影响回复
        if let Err(e) = self.deps.audience.add_user(sender.id).await {
            tracing::warn!(user_id = %sender.id, error = %e, "登记用户失败");
        }
        if message.chat_kind.is_group() {
            if let Err(e) = self.deps.audience.add_chat(message.chat_id).await {
                tracing::warn!(chat_id = %message.chat_id, error = %e, "登记群组失败");
            }
        }

        let me = self.deps.platform.get_me().await?;
        let keyboard = welcome_keyboard(&me.username, &self.deps.links);
        let text = format!(
            "👋 Hello {}!\n\n\
             I am an Instagram Reels Downloader Bot. Just send me an Instagram link and I will download it for you.\n\n\
             🔧 Commands:\n\
             • /start - To start the bot\n\
             • /stats - Show bot stats (owner only)\n\
             • /gcast - Broadcast message\n\n\
             Add me to your group for fast downloading!",
            sender.first_name
        );
        self.deps
            .platform
            .send_text(message.chat_id, &text, Some(message.message_id), Some(&keyboard))
            .await?;
        Ok(())
    }

    /// /stats：受众规模（仅运营）
    pub async fn handle_stats(&self, message: &IncomingMessage) -> Result<bool, ApplicationError> {
        if !self.sender_is_operator(message) {
            return Ok(false);
        }

        let chats = self.deps.audience.chats().await?.len();
        let users = self.deps.audience.users().await?.len();
        self.deps
            .platform
            .send_text(
                message.chat_id,
                &format!("Total Chats: {chats}\nTotal Users: {users}"),
                Some(message.message_id),
                None,
            )
            .await?;
        Ok(true)
    }

    /// /gcast、/broadcast 及其置顶变体
    pub async fn handle_broadcast(
        &self,
        message: &IncomingMessage,
        args: Option<&str>,
        pin_after_send: bool,
    ) -> Result<BroadcastCommandOutcome, ApplicationError> {
        if !self.sender_is_operator(message) {
            return Ok(BroadcastCommandOutcome::Unauthorized);
        }

        let handle = match self.deps.dispatcher.try_start() {
            Ok(handle) => handle,
            Err(_) => {
                self.reply(message, BROADCAST_BUSY_TEXT).await?;
                return Ok(BroadcastCommandOutcome::AlreadyInProgress);
            }
        };

        let reply = message.reply_to.map(|id| (message.chat_id, id));
        let payload = match BroadcastPayload::from_command(reply, args) {
            Ok(payload) => payload,
            Err(e) => {
                drop(handle);
                self.reply(message, &format!("❌ {}", validation_message(&e)))
                    .await?;
                return Ok(BroadcastCommandOutcome::MissingPayload);
            }
        };

        let panel = self
            .deps
            .platform
            .send_text(message.chat_id, BROADCAST_PANEL_TEXT, Some(message.message_id), None)
            .await?;

        let outcome = match self
            .deps
            .dispatcher
            .run_with(handle, &payload, pin_after_send)
            .await
        {
            Ok(summary) => {
                let text = format!(
                    "📢 Broadcast Complete\n✅ Success: {}\n❌ Failed: {}",
                    summary.success, summary.failed
                );
                self.edit_panel(message, panel.message_id, &text).await;
                BroadcastCommandOutcome::Completed(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "广播中止");
                self.edit_panel(message, panel.message_id, &format!("❌ Broadcast aborted: {e}"))
                    .await;
                BroadcastCommandOutcome::Failed(e)
            }
        };
        Ok(outcome)
    }

    fn sender_is_operator(&self, message: &IncomingMessage) -> bool {
        let allowed = message
            .from
            .as_ref()
            .map(|s| self.is_operator(s.id))
            .unwrap_or(false);
        if !allowed {
            tracing::debug!(chat_id = %message.chat_id, "忽略非运营用户的命令");
        }
        allowed
    }

    async fn reply(&self, message: &IncomingMessage, text: &str) -> Result<(), ApplicationError> {
        self.deps
            .platform
            .send_text(message.chat_id, text, Some(message.message_id), None)
            .await?;
        Ok(())
    }

    async fn edit_panel(&self, message: &IncomingMessage, panel: domain::MessageId, text: &str) {
        if let Err(e) = self
            .deps
            .platform
            .edit_text(message.chat_id, panel, text)
            .await
        {
            tracing::warn!(error = %e, "更新广播面板失败");
        }
    }
}

fn validation_message(error: &domain::DomainError) -> String {
    match error {
        domain::DomainError::ValidationError { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::memory::MemoryAudienceStore;
    use crate::testing::FakePlatform;
    use domain::{ChatId, ChatKind, MessageId, Sender};
    use std::time::Duration;

    const OWNER: UserId = UserId(1);

    fn service(platform: Arc<FakePlatform>, audience: Arc<MemoryAudienceStore>) -> AdminService {
        let dispatcher = Arc::new(BroadcastDispatcher::new(
            platform.clone(),
            audience.clone(),
            Duration::from_millis(1),
        ));
        AdminService::new(AdminServiceDependencies {
            platform,
            audience,
            dispatcher,
            operators: HashSet::from([OWNER]),
            links: CommunityLinks::default(),
        })
    }

    fn command(from: UserId, chat: ChatId, kind: ChatKind, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: chat,
            chat_kind: kind,
            message_id: MessageId(10),
            from: Some(Sender {
                id: from,
                first_name: "Op".into(),
            }),
            text: Some(text.into()),
            reply_to: None,
            edited: false,
        }
    }

    #[tokio::test]
    async fn start_registers_user_and_group() {
        let platform = Arc::new(FakePlatform::default());
        let audience = Arc::new(MemoryAudienceStore::new());
        let service = service(platform.clone(), audience.clone());

        service
            .handle_start(&command(UserId(7), ChatId(-70), ChatKind::Supergroup, "/start"))
            .await
            .unwrap();
        service
            .handle_start(&command(UserId(8), ChatId(8), ChatKind::Private, "/start"))
            .await
            .unwrap();

        assert_eq!(audience.users().await.unwrap(), vec![UserId(7), UserId(8)]);
        assert_eq!(audience.chats().await.unwrap(), vec![ChatId(-70)]);
        assert_eq!(platform.texts().len(), 2);
    }

    #[tokio::test]
    async fn stats_is_operator_only() {
        let platform = Arc::new(FakePlatform::default());
        let audience = Arc::new(MemoryAudienceStore::with_members(
            vec![UserId(2), UserId(3)],
            vec![ChatId(-1)],
        ));
        let service = service(platform.clone(), audience);

        let stranger = command(UserId(99), ChatId(99), ChatKind::Private, "/stats");
        assert!(!service.handle_stats(&stranger).await.unwrap());
        assert!(platform.texts().is_empty());

        let owner = command(OWNER, ChatId(1), ChatKind::Private, "/stats");
        assert!(service.handle_stats(&owner).await.unwrap());
        assert_eq!(
            platform.texts_to(ChatId(1)),
            vec!["Total Chats: 1\nTotal Users: 2".to_string()]
        );
    }

    #[tokio::test]
    async fn broadcast_reports_summary_in_panel() {
        let platform = Arc::new(FakePlatform::default());
        platform.always_fail(ChatId(2), crate::platform::PlatformError::unreachable("blocked"));
        let audience = Arc::new(MemoryAudienceStore::with_members(
            vec![UserId(2), UserId(3)],
            vec![ChatId(-4)],
        ));
        let service = service(platform.clone(), audience);

        let msg = command(OWNER, ChatId(1), ChatKind::Private, "/gcast hello");
        let outcome = service
            .handle_broadcast(&msg, Some("hello"), false)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BroadcastCommandOutcome::Completed(BroadcastSummary { success: 2, failed: 1 })
        );
        let last = platform.edits().last().unwrap().2.clone();
        assert_eq!(last, "📢 Broadcast Complete\n✅ Success: 2\n❌ Failed: 1");
    }

    #[tokio::test]
    async fn broadcast_without_payload_starts_nothing() {
        let platform = Arc::new(FakePlatform::default());
        let audience = Arc::new(MemoryAudienceStore::with_members(vec![UserId(2)], vec![]));
        let service = service(platform.clone(), audience);

        let msg = command(OWNER, ChatId(1), ChatKind::Private, "/gcast");
        let outcome = service.handle_broadcast(&msg, None, false).await.unwrap();

        assert_eq!(outcome, BroadcastCommandOutcome::MissingPayload);
        assert_eq!(platform.send_attempts(ChatId(2)), 0);
        assert_eq!(
            platform.texts_to(ChatId(1)),
            vec!["❌ Provide text or reply to a message to broadcast.".to_string()]
        );
        assert!(!service.deps.dispatcher.is_running());
    }

    #[tokio::test]
    async fn broadcast_rejected_while_another_runs() {
        let platform = Arc::new(FakePlatform::default());
        let audience = Arc::new(MemoryAudienceStore::new());
        let service = service(platform.clone(), audience);

        let _running = service.deps.dispatcher.try_start().unwrap();
        let msg = command(OWNER, ChatId(1), ChatKind::Private, "/gcast hi");
        let outcome = service
            .handle_broadcast(&msg, Some("hi"), false)
            .await
            .unwrap();

        assert_eq!(outcome, BroadcastCommandOutcome::AlreadyInProgress);
        assert_eq!(platform.texts_to(ChatId(1)), vec![BROADCAST_BUSY_TEXT.to_string()]);
    }

    #[tokio::test]
    async fn non_operator_broadcast_is_ignored() {
        let platform = Arc::new(FakePlatform::default());
        let service = service(platform.clone(), Arc::new(MemoryAudienceStore::new()));

        let msg = command(UserId(42), ChatId(42), ChatKind::Private, "/gcast hi");
        let outcome = service
            .handle_broadcast(&msg, Some("hi"), true)
            .await
            .unwrap();

        assert_eq!(outcome, BroadcastCommandOutcome::Unauthorized);
        assert!(platform.texts().is_empty());
    }
}
