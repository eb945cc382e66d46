//! Message enrichment: domain `Message` → wire `MessageView`.
//!
//! Resolves the sender to a user projection (placeholder when the
//! lookup fails, since enrichment must never fail a delivery) and, for file
//! messages, the file reference to a file projection.

use std::sync::Arc;

use crate::domain::{
    FileStore, Message, MessageView, Sender, UserDirectory, UserProjection,
};

pub struct MessageProjector {
    directory: Arc<dyn UserDirectory>,
    file_store: Arc<dyn FileStore>,
}

impl MessageProjector {
    pub fn new(directory: Arc<dyn UserDirectory>, file_store: Arc<dyn FileStore>) -> Self {
        Self {
            directory,
            file_store,
        }
    }

    pub async fn project(&self, message: &Message) -> MessageView {
        let sender = match &message.sender {
            Sender::User(user) => match self.directory.get_user_by_id(user).await {
                Ok(Some(projection)) => projection,
                Ok(None) => UserProjection::unknown(user.as_str()),
                Err(e) => {
                    tracing::warn!("Sender lookup failed for '{}': {}", user, e);
                    UserProjection::unknown(user.as_str())
                }
            },
            Sender::System => UserProjection::system(),
            Sender::Ai(kind) => UserProjection::ai(kind),
        };

        let file = match &message.file {
            Some(file_id) => match self.file_store.get_file(file_id).await {
                Ok(projection) => projection,
                Err(e) => {
                    tracing::warn!("File lookup failed for '{}': {}", file_id, e);
                    None
                }
            },
            None => None,
        };

        MessageView {
            id: message.id.as_str().to_string(),
            room_id: message.room_id.as_str().to_string(),
            kind: message.kind,
            sender,
            content: message.content.clone(),
            file,
            ai_kind: message.ai_kind.as_ref().map(|k| k.as_str().to_string()),
            timestamp: message.timestamp.value(),
            readers: message.readers.iter().map(|r| r.as_str().to_string()).collect(),
            reactions: message
                .reactions
                .iter()
                .map(|(key, users)| {
                    (
                        key.clone(),
                        users.iter().map(|u| u.as_str().to_string()).collect(),
                    )
                })
                .collect(),
            metadata: message.metadata.clone(),
        }
    }

    pub async fn project_all(&self, messages: &[Message]) -> Vec<MessageView> {
        let mut views = Vec::with_capacity(messages.len());
        for message in messages {
            views.push(self.project(message).await);
        }
        views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MessageId, MessageKind, MockFileStore, MockUserDirectory, NewMessage, RoomId, Timestamp,
        UserId,
    };
    use mockall::predicate::eq;

    fn text_message(sender_id: &str) -> Message {
        let new = NewMessage::new(
            RoomId::new("lobby".to_string()).unwrap(),
            Sender::User(UserId::new(sender_id.to_string()).unwrap()),
            MessageKind::Text,
            "hello".to_string(),
            Timestamp::new(1_000),
        );
        Message {
            id: MessageId::generate(),
            room_id: new.room_id,
            sender: new.sender,
            kind: new.kind,
            content: new.content,
            file: None,
            ai_kind: None,
            timestamp: new.timestamp,
            mentions: Vec::new(),
            readers: Default::default(),
            reactions: Default::default(),
            metadata: Default::default(),
            deleted: false,
        }
    }

    #[tokio::test]
    async fn test_project_resolves_sender() {
        // テスト項目: 送信者がディレクトリ経由でプロジェクションに解決される
        // given (前提条件):
        let mut directory = MockUserDirectory::new();
        directory
            .expect_get_user_by_id()
            .with(eq(UserId::new("alice".to_string()).unwrap()))
            .returning(|_| {
                Ok(Some(UserProjection {
                    id: "alice".to_string(),
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                    profile_image: None,
                }))
            });
        let file_store = MockFileStore::new();
        let projector = MessageProjector::new(Arc::new(directory), Arc::new(file_store));

        // when (操作):
        let view = projector.project(&text_message("alice")).await;

        // then (期待する結果):
        assert_eq!(view.sender.name, "Alice");
        assert_eq!(view.content, "hello");
    }

    #[tokio::test]
    async fn test_project_falls_back_to_unknown_user() {
        // テスト項目: 送信者が解決できない場合プレースホルダになる
        // given (前提条件):
        let mut directory = MockUserDirectory::new();
        directory.expect_get_user_by_id().returning(|_| Ok(None));
        let projector =
            MessageProjector::new(Arc::new(directory), Arc::new(MockFileStore::new()));

        // when (操作):
        let view = projector.project(&text_message("ghost")).await;

        // then (期待する結果):
        assert_eq!(view.sender.id, "ghost");
        assert_eq!(view.sender.name, "Unknown User");
    }
}
