//! Redis 実装の PresenceRepository
//!
//! `register` は SET ... GET で旧値の取得と上書きを 1 コマンドにし、
//! `release` は Lua スクリプトで比較削除を原子的に行う。古い接続の
//! 遅延切断が新しい登録を消してしまわないための要。

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::domain::{ConnectionId, PresenceRepository, RepositoryError, UserId};

use super::store_err;

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;

/// Redis 実装の PresenceRepository
pub struct RedisPresenceRepository {
    conn: ConnectionManager,
}

impl RedisPresenceRepository {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn key(user: &UserId) -> String {
        format!("chanoma:presence:{user}")
    }
}

#[async_trait]
impl PresenceRepository for RedisPresenceRepository {
    async fn register(
        &self,
        user: &UserId,
        conn: ConnectionId,
    ) -> Result<Option<ConnectionId>, RepositoryError> {
        let mut redis = self.conn.clone();
        let previous: Option<String> = redis::cmd("SET")
            .arg(Self::key(user))
            .arg(conn.to_string())
            .arg("GET")
            .query_async(&mut redis)
            .await
            .map_err(store_err)?;

        match previous {
            None => Ok(None),
            Some(raw) => ConnectionId::parse(&raw).map(Some).map_err(|_| {
                RepositoryError::Store(format!("corrupt presence entry for '{user}': {raw}"))
            }),
        }
    }

    async fn current(&self, user: &UserId) -> Result<Option<ConnectionId>, RepositoryError> {
        let mut redis = self.conn.clone();
        let raw: Option<String> = redis.get(Self::key(user)).await.map_err(store_err)?;
        match raw {
            None => Ok(None),
            Some(raw) => ConnectionId::parse(&raw).map(Some).map_err(|_| {
                RepositoryError::Store(format!("corrupt presence entry for '{user}': {raw}"))
            }),
        }
    }

    async fn release(&self, user: &UserId, conn: ConnectionId) -> Result<bool, RepositoryError> {
        let mut redis = self.conn.clone();
        let deleted: i64 = redis::Script::new(RELEASE_SCRIPT)
            .key(Self::key(user))
            .arg(conn.to_string())
            .invoke_async(&mut redis)
            .await
            .map_err(store_err)?;
        Ok(deleted == 1)
    }
}
