use async_trait::async_trait;
use domain::{ChatId, UserId};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AudienceError {
    #[error("audience store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt audience entry: {0}")]
    Corrupt(String),
}

/// 受众存储：只追加的用户集合与会话集合
#[async_trait]
pub trait AudienceStore: Send + Sync {
    async fn add_user(&self, user_id: UserId) -> Result<(), AudienceError>;

    async fn add_chat(&self, chat_id: ChatId) -> Result<(), AudienceError>;

    async fn users(&self) -> Result<Vec<UserId>, AudienceError>;

    async fn chats(&self) -> Result<Vec<ChatId>, AudienceError>;
}

/// 内存实现的受众存储（用于测试和本地开发）
pub mod memory {
    use super::*;
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub struct MemoryAudienceStore {
        users: RwLock<Vec<UserId>>,
        chats: RwLock<Vec<ChatId>>,
    }

    impl MemoryAudienceStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_members(users: Vec<UserId>, chats: Vec<ChatId>) -> Self {
            Self {
                users: RwLock::new(users),
                chats: RwLock::new(chats),
            }
        }
    }

    #[async_trait]
    impl AudienceStore for MemoryAudienceStore {
        async fn add_user(&self, user_id: UserId) -> Result<(), AudienceError> {
            let mut users = self.users.write().await;
            if !users.contains(&user_id) {
                users.push(user_id);
            }
            Ok(())
        }

        async fn add_chat(&self, chat_id: ChatId) -> Result<(), AudienceError> {
            let mut chats = self.chats.write().await;
            if !chats.contains(&chat_id) {
                chats.push(chat_id);
            }
            Ok(())
        }

        async fn users(&self) -> Result<Vec<UserId>, AudienceError> {
            Ok(self.users.read().await.clone())
        }

        async fn chats(&self) -> Result<Vec<ChatId>, AudienceError> {
            Ok(self.chats.read().await.clone())
        }
    }

}
