//! 订阅门槛
//!
//! 私聊使用前，请求者必须加入配置的频道/群组。

use serde::{Deserialize, Serialize};

use crate::value_objects::ChatRef;

/// 门槛类型，决定提示按钮的文案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    /// 直接加入
    Join,
    /// 申请加入
    JoinRequest,
}

impl RequirementKind {
    pub fn button_label(&self) -> &'static str {
        match self {
            RequirementKind::Join => "📢 Join Channel",
            RequirementKind::JoinRequest => "📩 Request to Join",
        }
    }
}

/// 一个"必须加入"条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRequirement {
    pub chat: ChatRef,
    pub kind: RequirementKind,
}

impl SubscriptionRequirement {
    pub fn new(chat: ChatRef, kind: RequirementKind) -> Self {
        Self { chat, kind }
    }
}

/// 成员状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl MembershipStatus {
    /// 只有正式成员、管理员、所有者满足门槛
    pub fn satisfies_requirement(&self) -> bool {
        matches!(
            self,
            MembershipStatus::Creator | MembershipStatus::Administrator | MembershipStatus::Member
        )
    }
}

/// 未满足的条件及原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmetRequirement {
    pub requirement: SubscriptionRequirement,
    pub reason: UnmetReason,
}

/// 未满足原因，仅用于日志区分，对用户统一表现为未加入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmetReason {
    NotMember(MembershipStatus),
    LookupFailed(String),
}

/// 门槛判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Blocked(Vec<UnmetRequirement>),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}
