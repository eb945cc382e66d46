//! インメモリ実装の RoomStore

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, Room, RoomId, RoomStore, UserId};

/// インメモリ実装の RoomStore
pub struct InMemoryRoomStore {
    rooms: Arc<Mutex<HashMap<RoomId, Room>>>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seed one room record (startup wiring and tests).
    pub async fn insert_room(&self, room: Room) {
        let mut rooms = self.rooms.lock().await;
        rooms.insert(room.id.clone(), room);
    }
}

impl Default for InMemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn get_room(&self, room: &RoomId) -> Result<Option<Room>, RepositoryError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(room).cloned())
    }

    async fn add_participant(&self, room: &RoomId, user: &UserId) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let record = rooms
            .get_mut(room)
            .ok_or_else(|| RepositoryError::NotFound(room.as_str().to_string()))?;
        record.participants.insert(user.clone());
        Ok(())
    }

    async fn remove_participant(
        &self,
        room: &RoomId,
        user: &UserId,
    ) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        let record = rooms
            .get_mut(room)
            .ok_or_else(|| RepositoryError::NotFound(room.as_str().to_string()))?;
        record.participants.remove(user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;

    fn lobby() -> Room {
        Room {
            id: RoomId::new("lobby".to_string()).unwrap(),
            name: "Lobby".to_string(),
            creator: UserId::new("alice".to_string()).unwrap(),
            has_password: false,
            created_at: Timestamp::new(0),
            participants: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_participant_mirror_tracks_membership() {
        // テスト項目: Room レコードの参加者集合が追加・削除に追従する
        // given (前提条件):
        let store = InMemoryRoomStore::new();
        let room = lobby();
        let bob = UserId::new("bob".to_string()).unwrap();
        store.insert_room(room.clone()).await;

        // when (操作):
        store.add_participant(&room.id, &bob).await.unwrap();

        // then (期待する結果):
        let record = store.get_room(&room.id).await.unwrap().unwrap();
        assert!(record.participants.contains(&bob));

        store.remove_participant(&room.id, &bob).await.unwrap();
        let record = store.get_room(&room.id).await.unwrap().unwrap();
        assert!(record.participants.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_room_is_not_found() {
        // テスト項目: 未登録ルームへの参加者追加は NotFound
        // given (前提条件):
        let store = InMemoryRoomStore::new();
        let ghost = RoomId::new("ghost".to_string()).unwrap();
        let bob = UserId::new("bob".to_string()).unwrap();

        // when (操作):
        let result = store.add_participant(&ghost, &bob).await;

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }
}
