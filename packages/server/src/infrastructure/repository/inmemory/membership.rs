//! インメモリ実装の MembershipRepository

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{MembershipRepository, RepositoryError, RoomId, UserId};

#[derive(Default)]
struct Inner {
    /// 正: ユーザー → 現在のルーム
    users: HashMap<UserId, RoomId>,
    /// ミラー: ルーム → メンバー集合
    rooms: HashMap<RoomId, BTreeSet<UserId>>,
}

/// インメモリ実装の MembershipRepository
pub struct InMemoryMembershipRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryMembershipRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }
}

impl Default for InMemoryMembershipRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipRepository for InMemoryMembershipRepository {
    async fn current_room(&self, user: &UserId) -> Result<Option<RoomId>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(user).cloned())
    }

    async fn set_current_room(&self, user: &UserId, room: &RoomId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.users.insert(user.clone(), room.clone());
        Ok(())
    }

    async fn clear_current_room(&self, user: &UserId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner.users.remove(user);
        Ok(())
    }

    async fn add_member(&self, room: &RoomId, user: &UserId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        inner
            .rooms
            .entry(room.clone())
            .or_default()
            .insert(user.clone());
        Ok(())
    }

    async fn remove_member(&self, room: &RoomId, user: &UserId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(user);
            if members.is_empty() {
                inner.rooms.remove(room);
            }
        }
        Ok(())
    }

    async fn members(&self, room: &RoomId) -> Result<Vec<UserId>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rooms
            .get(room)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }
}
