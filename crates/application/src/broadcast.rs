//! 广播分发
//!
//! 同一时刻最多一个广播任务：`BroadcastLock::try_acquire` 用 CAS 发放运行句柄，
//! 句柄析构时释放锁，任何退出路径都不会遗留"进行中"状态。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use domain::{dedup_audience, BroadcastPayload, BroadcastSummary, ChatId};
use thiserror::Error;
use tokio::time::sleep;

use crate::audience::{AudienceError, AudienceStore};
use crate::platform::{MessagingPlatform, PlatformError, SentMessage};

/// 目标之间的默认间隔
pub const DEFAULT_INTER_SEND_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BroadcastError {
    #[error("a broadcast is already in progress")]
    AlreadyInProgress,

    #[error("cannot read audience: {0}")]
    Audience(#[from] AudienceError),
}

/// 进程内广播互斥锁
#[derive(Debug, Default)]
pub struct BroadcastLock {
    running: AtomicBool,
}

impl BroadcastLock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 原子地检查并占用；已被占用时返回 `None`
    pub fn try_acquire(self: &Arc<Self>) -> Option<BroadcastRunHandle> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BroadcastRunHandle {
                lock: Arc::clone(self),
                summary: BroadcastSummary::default(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// 一次广播运行的句柄，持有本次的成功/失败计数
#[derive(Debug)]
pub struct BroadcastRunHandle {
    lock: Arc<BroadcastLock>,
    summary: BroadcastSummary,
}

impl BroadcastRunHandle {
    pub fn record_success(&mut self) {
        self.summary.success += 1;
    }

    pub fn record_failure(&mut self) {
        self.summary.failed += 1;
    }

    pub fn summary(&self) -> BroadcastSummary {
        self.summary
    }
}

impl Drop for BroadcastRunHandle {
    fn drop(&mut self) {
        self.lock.running.store(false, Ordering::Release);
    }
}

pub struct BroadcastDispatcher {
    platform: Arc<dyn MessagingPlatform>,
    audience: Arc<dyn AudienceStore>,
    lock: Arc<BroadcastLock>,
    inter_send_delay: Duration,
}

impl BroadcastDispatcher {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        audience: Arc<dyn AudienceStore>,
        inter_send_delay: Duration,
    ) -> Self {
        Self {
            platform,
            audience,
            lock: BroadcastLock::new(),
            inter_send_delay,
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock.is_running()
    }

    /// 占用广播锁；供调用方在做任何外部动作前先确认没有进行中的广播
    pub fn try_start(&self) -> Result<BroadcastRunHandle, BroadcastError> {
        self.lock
            .try_acquire()
            .ok_or(BroadcastError::AlreadyInProgress)
    }

    /// 占用锁并执行一次完整广播
    pub async fn run(
        &self,
        payload: &BroadcastPayload,
        pin_after_send: bool,
    ) -> Result<BroadcastSummary, BroadcastError> {
        let handle = self.try_start()?;
        self.run_with(handle, payload, pin_after_send).await
    }

    /// 使用已占用的句柄执行广播；句柄在返回前释放
    pub async fn run_with(
        &self,
        mut handle: BroadcastRunHandle,
        payload: &BroadcastPayload,
        pin_after_send: bool,
    ) -> Result<BroadcastSummary, BroadcastError> {
        let targets = self.targets().await?;
        tracing::info!(targets = targets.len(), pin = pin_after_send, "开始广播");

        for target in targets {
            let outcome = match self.send_one(target, payload).await {
                Err(PlatformError::RateLimited { retry_after }) => {
                    tracing::warn!(
                        chat_id = %target,
                        retry_after_secs = retry_after.as_secs(),
                        "触发限流，等待后重试一次"
                    );
                    sleep(retry_after).await;
                    self.send_one(target, payload).await
                }
                other => other,
            };

            match outcome {
                Ok(sent) => {
                    if pin_after_send {
                        if let Err(e) = self
                            .platform
                            .pin_message(sent.chat_id, sent.message_id, false)
                            .await
                        {
                            tracing::debug!(chat_id = %target, error = %e, "置顶失败");
                        }
                    }
                    handle.record_success();
                }
                Err(PlatformError::RecipientUnreachable(reason)) => {
                    tracing::debug!(chat_id = %target, %reason, "接收方不可达");
                    handle.record_failure();
                }
                Err(e) => {
                    tracing::warn!(chat_id = %target, error = %e, "广播发送失败");
                    handle.record_failure();
                }
            }

            sleep(self.inter_send_delay).await;
        }

        let summary = handle.summary();
        tracing::info!(
            success = summary.success,
            failed = summary.failed,
            "广播完成"
        );
        Ok(summary)
    }

    async fn targets(&self) -> Result<Vec<ChatId>, BroadcastError> {
        let chats = self.audience.chats().await?;
        let users: Vec<ChatId> = self
            .audience
            .users()
            .await?
            .into_iter()
            .map(ChatId::from)
            .collect();
        Ok(dedup_audience(&chats, &users))
    }

    async fn send_one(
        &self,
        target: ChatId,
        payload: &BroadcastPayload,
    ) -> Result<SentMessage, PlatformError> {
        match payload {
            BroadcastPayload::Copy {
                from_chat,
                message_id,
            } => {
                self.platform
                    .copy_message(target, *from_chat, *message_id)
                    .await
            }
            BroadcastPayload::Text(text) => {
                self.platform.send_text(target, text, None, None).await
            }
        }
    }
}
