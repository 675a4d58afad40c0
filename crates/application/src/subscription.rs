//! 订阅门槛检查
//!
//! 仅私聊受限；查询失败按"未加入"处理（拒绝访问），区分原因只写日志。

use std::sync::Arc;

use domain::{
    ChatKind, GateDecision, InlineButton, InlineKeyboard, SubscriptionRequirement,
    UnmetReason, UnmetRequirement, UserId,
};

use crate::platform::MessagingPlatform;

/// "重新检查"按钮的回调数据
pub const VERIFY_CALLBACK: &str = "check_sub";

pub const ACCESS_DENIED_TEXT: &str =
    "⚠️ Access Denied!\n\nYou must join our channels to use this bot.";

pub struct SubscriptionGate {
    platform: Arc<dyn MessagingPlatform>,
    requirements: Vec<SubscriptionRequirement>,
}

impl SubscriptionGate {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        requirements: Vec<SubscriptionRequirement>,
    ) -> Self {
        Self {
            platform,
            requirements,
        }
    }

    pub fn requirements(&self) -> &[SubscriptionRequirement] {
        &self.requirements
    }

    /// 判定请求者是否满足全部门槛；不修改任何状态，可重复调用
    pub async fn evaluate(&self, user_id: UserId, chat_kind: ChatKind) -> GateDecision {
        if !chat_kind.is_private() || self.requirements.is_empty() {
            return GateDecision::Allowed;
        }

        let mut unmet = Vec::new();
        for requirement in &self.requirements {
            let reason = match self.platform.get_chat_member(&requirement.chat, user_id).await {
                Ok(status) if status.satisfies_requirement() => continue,
                Ok(status) => {
                    tracing::debug!(
                        user_id = %user_id,
                        chat = %requirement.chat,
                        ?status,
                        "用户未加入"
                    );
                    UnmetReason::NotMember(status)
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        chat = %requirement.chat,
                        error = %e,
                        "成员查询失败，按未加入处理"
                    );
                    UnmetReason::LookupFailed(e.to_string())
                }
            };
            unmet.push(UnmetRequirement {
                requirement: requirement.clone(),
                reason,
            });
        }

        if unmet.is_empty() {
            GateDecision::Allowed
        } else {
            GateDecision::Blocked(unmet)
        }
    }

    /// 为未满足的条件生成加入链接，每个条件一个按钮，最后是一个重新检查按钮
    ///
    /// 无法获取链接的会话会被跳过。
    pub async fn join_keyboard(&self, unmet: &[UnmetRequirement]) -> InlineKeyboard {
        let mut keyboard = InlineKeyboard::new();
        for item in unmet {
            let requirement = &item.requirement;
            match self.platform.get_chat(&requirement.chat).await {
                Ok(info) => match info.join_url() {
                    Some(url) => {
                        keyboard = keyboard
                            .row(vec![InlineButton::url(requirement.kind.button_label(), url)]);
                    }
                    None => {
                        tracing::warn!(chat = %requirement.chat, "会话没有可用的加入链接");
                    }
                },
                Err(e) => {
                    tracing::warn!(chat = %requirement.chat, error = %e, "获取会话信息失败");
                }
            }
        }
        keyboard.row(vec![InlineButton::callback(
            "🔄 Verify Subscription",
            VERIFY_CALLBACK,
        )])
    }
}
