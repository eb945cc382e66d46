//! インメモリ実装の MessageRepository

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Message, MessageId, MessagePage, MessageRepository, NewMessage, RepositoryError, RoomId,
    UserId,
};

#[derive(Default)]
struct Inner {
    by_id: HashMap<MessageId, Message>,
    /// ルームごとの ID 列、挿入順
    by_room: HashMap<RoomId, Vec<MessageId>>,
}

/// インメモリ実装の MessageRepository
pub struct InMemoryMessageRepository {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }
}

impl Default for InMemoryMessageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create(&self, new: NewMessage) -> Result<Message, RepositoryError> {
        let message = Message {
            id: MessageId::generate(),
            room_id: new.room_id,
            sender: new.sender,
            kind: new.kind,
            content: new.content,
            file: new.file,
            ai_kind: new.ai_kind,
            timestamp: new.timestamp,
            mentions: new.mentions,
            readers: BTreeSet::new(),
            reactions: BTreeMap::new(),
            metadata: new.metadata,
            deleted: false,
        };

        let mut inner = self.inner.lock().await;
        inner
            .by_room
            .entry(message.room_id.clone())
            .or_default()
            .push(message.id.clone());
        inner.by_id.insert(message.id.clone(), message.clone());
        Ok(message)
    }

    async fn get(&self, id: &MessageId) -> Result<Option<Message>, RepositoryError> {
        let inner = self.inner.lock().await;
        Ok(inner.by_id.get(id).cloned())
    }

    async fn page_before(
        &self,
        room: &RoomId,
        before: Option<i64>,
        limit: usize,
    ) -> Result<MessagePage, RepositoryError> {
        let inner = self.inner.lock().await;
        let ids = inner.by_room.get(room).cloned().unwrap_or_default();

        // 挿入順を保った安定ソートで時刻順に並べる
        let mut candidates: Vec<&Message> = ids
            .iter()
            .filter_map(|id| inner.by_id.get(id))
            .filter(|m| !m.deleted)
            .filter(|m| match before {
                Some(before) => m.timestamp.value() < before,
                None => true,
            })
            .collect();
        candidates.sort_by_key(|m| m.timestamp);

        let has_more = candidates.len() > limit;
        let start = candidates.len().saturating_sub(limit);
        let messages: Vec<Message> = candidates[start..].iter().map(|m| (*m).clone()).collect();
        let oldest_timestamp = messages.first().map(|m| m.timestamp.value());

        Ok(MessagePage {
            messages,
            has_more,
            oldest_timestamp,
        })
    }

    async fn mark_read(
        &self,
        user: &UserId,
        room: &RoomId,
        ids: &[MessageId],
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        for id in ids {
            // 既に消えた/別ルームの id は黙って飛ばす
            if let Some(message) = inner.by_id.get_mut(id)
                && message.room_id == *room
            {
                message.readers.insert(user.clone());
            }
        }
        Ok(())
    }

    async fn add_reaction(
        &self,
        id: &MessageId,
        reaction: &str,
        user: &UserId,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let message = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.as_str().to_string()))?;
        message
            .reactions
            .entry(reaction.to_string())
            .or_default()
            .insert(user.clone());
        Ok(())
    }

    async fn remove_reaction(
        &self,
        id: &MessageId,
        reaction: &str,
        user: &UserId,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.inner.lock().await;
        let message = inner
            .by_id
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.as_str().to_string()))?;
        if let Some(users) = message.reactions.get_mut(reaction) {
            users.remove(user);
            if users.is_empty() {
                message.reactions.remove(reaction);
            }
        }
        Ok(())
    }

    async fn get_reactions(
        &self,
        id: &MessageId,
    ) -> Result<BTreeMap<String, BTreeSet<UserId>>, RepositoryError> {
        let inner = self.inner.lock().await;
        let message = inner
            .by_id
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound(id.as_str().to_string()))?;
        Ok(message.reactions.clone())
    }
}
