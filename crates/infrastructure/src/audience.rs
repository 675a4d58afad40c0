//! Redis 受众存储
//!
//! 用户和会话各存一个 Set，重复写入天然幂等。

use std::sync::Arc;

use application::{AudienceError, AudienceStore};
use async_trait::async_trait;
use domain::{ChatId, UserId};

pub const USERS_KEY: &str = "reelcast:users";
pub const CHATS_KEY: &str = "reelcast:chats";

pub struct RedisAudienceStore {
    redis_client: Arc<redis::Client>,
}

impl RedisAudienceStore {
    pub fn new(redis_client: Arc<redis::Client>) -> Self {
        Self { redis_client }
    }

    /// 获取连接
    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, AudienceError> {
        self.redis_client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AudienceError::Unavailable(format!("Redis connection failed: {e}")))
    }

    async fn add(&self, key: &str, member: i64) -> Result<(), AudienceError> {
        let mut conn = self.get_connection().await?;
        let _: i64 = redis::cmd("SADD")
            .arg(key)
            .arg(member)
            .query_async(&mut conn)
            .await
            .map_err(|e| AudienceError::Unavailable(format!("Redis operation failed: {e}")))?;
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<Vec<i64>, AudienceError> {
        let mut conn = self.get_connection().await?;
        let members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| AudienceError::Unavailable(format!("Redis operation failed: {e}")))?;
        parse_members(key, members)
    }
}

/// 集合成员应当全部是整数 ID
fn parse_members(key: &str, members: Vec<String>) -> Result<Vec<i64>, AudienceError> {
    members
        .into_iter()
        .map(|raw| {
            raw.parse::<i64>()
                .map_err(|_| AudienceError::Corrupt(format!("{key}: {raw}")))
        })
        .collect()
}

#[async_trait]
impl AudienceStore for RedisAudienceStore {
    async fn add_user(&self, user_id: UserId) -> Result<(), AudienceError> {
        self.add(USERS_KEY, user_id.0).await?;
        tracing::debug!(user_id = %user_id, "用户已登记");
        Ok(())
    }

    async fn add_chat(&self, chat_id: ChatId) -> Result<(), AudienceError> {
        self.add(CHATS_KEY, chat_id.0).await?;
        tracing::debug!(chat_id = %chat_id, "群组已登记");
        Ok(())
    }

    async fn users(&self) -> Result<Vec<UserId>, AudienceError> {
        Ok(self
            .members(USERS_KEY)
            .await?
            .into_iter()
            .map(UserId)
            .collect())
    }

    async fn chats(&self) -> Result<Vec<ChatId>, AudienceError> {
        Ok(self
            .members(CHATS_KEY)
            .await?
            .into_iter()
            .map(ChatId)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_must_be_integers() {
        assert_eq!(
            parse_members(USERS_KEY, vec!["1".into(), "-100200".into()]).unwrap(),
            vec![1, -100200]
        );
        assert_eq!(
            parse_members(CHATS_KEY, vec!["abc".into()]),
            Err(AudienceError::Corrupt("reelcast:chats: abc".into()))
        );
    }
}
