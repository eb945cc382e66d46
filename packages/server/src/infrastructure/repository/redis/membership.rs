//! Redis 実装の MembershipRepository
//!
//! ユーザー → ルームの正のマッピングは文字列キー、ルームごとの
//! メンバー集合は SET で持つ。2 つの構造はトランザクションで縛らず、
//! 正のマッピングを信頼してミラーのずれは許容する。

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::domain::{MembershipRepository, RepositoryError, RoomId, UserId};

use super::store_err;

/// Redis 実装の MembershipRepository
pub struct RedisMembershipRepository {
    conn: ConnectionManager,
}

impl RedisMembershipRepository {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    fn room_of_key(user: &UserId) -> String {
        format!("chanoma:room_of:{user}")
    }

    fn members_key(room: &RoomId) -> String {
        format!("chanoma:members:{room}")
    }
}

#[async_trait]
impl MembershipRepository for RedisMembershipRepository {
    async fn current_room(&self, user: &UserId) -> Result<Option<RoomId>, RepositoryError> {
        let mut redis = self.conn.clone();
        let raw: Option<String> = redis
            .get(Self::room_of_key(user))
            .await
            .map_err(store_err)?;
        match raw {
            None => Ok(None),
            Some(raw) => RoomId::new(raw.clone()).map(Some).map_err(|_| {
                RepositoryError::Store(format!("corrupt room mapping for '{user}': {raw}"))
            }),
        }
    }

    async fn set_current_room(&self, user: &UserId, room: &RoomId) -> Result<(), RepositoryError> {
        let mut redis = self.conn.clone();
        redis
            .set::<_, _, ()>(Self::room_of_key(user), room.as_str())
            .await
            .map_err(store_err)
    }

    async fn clear_current_room(&self, user: &UserId) -> Result<(), RepositoryError> {
        let mut redis = self.conn.clone();
        redis
            .del::<_, ()>(Self::room_of_key(user))
            .await
            .map_err(store_err)
    }

    async fn add_member(&self, room: &RoomId, user: &UserId) -> Result<(), RepositoryError> {
        let mut redis = self.conn.clone();
        redis
            .sadd::<_, _, ()>(Self::members_key(room), user.as_str())
            .await
            .map_err(store_err)
    }

    async fn remove_member(&self, room: &RoomId, user: &UserId) -> Result<(), RepositoryError> {
        let mut redis = self.conn.clone();
        redis
            .srem::<_, _, ()>(Self::members_key(room), user.as_str())
            .await
            .map_err(store_err)
    }

    async fn members(&self, room: &RoomId) -> Result<Vec<UserId>, RepositoryError> {
        let mut redis = self.conn.clone();
        let raw: Vec<String> = redis
            .smembers(Self::members_key(room))
            .await
            .map_err(store_err)?;

        let mut members = Vec::with_capacity(raw.len());
        for value in raw {
            match UserId::new(value.clone()) {
                Ok(user) => members.push(user),
                Err(_) => {
                    tracing::warn!("Skipping corrupt member entry '{}' in '{}'", value, room);
                }
            }
        }
        Ok(members)
    }
}
