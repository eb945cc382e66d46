//! インメモリ実装の PresenceRepository

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, PresenceRepository, RepositoryError, UserId};

/// インメモリ実装の PresenceRepository
///
/// `register` の上書きと `release` の比較削除は 1 つのロックの下で
/// 行われるため原子的になる。
pub struct InMemoryPresenceRepository {
    sessions: Arc<Mutex<HashMap<UserId, ConnectionId>>>,
}

impl InMemoryPresenceRepository {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryPresenceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceRepository for InMemoryPresenceRepository {
    async fn register(
        &self,
        user: &UserId,
        conn: ConnectionId,
    ) -> Result<Option<ConnectionId>, RepositoryError> {
        let mut sessions = self.sessions.lock().await;
        Ok(sessions.insert(user.clone(), conn))
    }

    async fn current(&self, user: &UserId) -> Result<Option<ConnectionId>, RepositoryError> {
        let sessions = self.sessions.lock().await;
        Ok(sessions.get(user).copied())
    }

    async fn release(&self, user: &UserId, conn: ConnectionId) -> Result<bool, RepositoryError> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(user) {
            Some(current) if *current == conn => {
                sessions.remove(user);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> UserId {
        UserId::new("alice".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_register_returns_previous_connection() {
        // テスト項目: 上書き登録で直前の接続 ID が返る
        // given (前提条件):
        let repo = InMemoryPresenceRepository::new();
        let first = ConnectionId::generate();
        let second = ConnectionId::generate();
        assert_eq!(repo.register(&alice(), first).await.unwrap(), None);

        // when (操作):
        let previous = repo.register(&alice(), second).await.unwrap();

        // then (期待する結果):
        assert_eq!(previous, Some(first));
        assert_eq!(repo.current(&alice()).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_release_is_guarded_by_connection_id() {
        // テスト項目: 他の接続 ID での release は削除しない
        // given (前提条件):
        let repo = InMemoryPresenceRepository::new();
        let current = ConnectionId::generate();
        let stale = ConnectionId::generate();
        repo.register(&alice(), current).await.unwrap();

        // when (操作):
        let released = repo.release(&alice(), stale).await.unwrap();

        // then (期待する結果): 失敗し、登録は残る
        assert!(!released);
        assert_eq!(repo.current(&alice()).await.unwrap(), Some(current));

        // 正しい接続 ID なら消える
        assert!(repo.release(&alice(), current).await.unwrap());
        assert_eq!(repo.current(&alice()).await.unwrap(), None);
    }
}
