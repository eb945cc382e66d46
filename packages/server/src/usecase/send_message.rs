//! UseCase: メッセージ送信処理
//!
//! クライアントが投稿できるのは text / file の2種類のみ。空文字に
//! トリムされたテキストはエラーではなく黙って捨てる。AI メンションの
//! 抽出は永続化前に行い、本文はそのまま保存しつつ、AI への問い合わせは
//! メンション除去後のテキストで行う。配信は永続化成功の後。

use std::sync::Arc;

use chanoma_shared::time::Clock;

use crate::domain::{
    extract_mentions, AiKind, FileId, FileStore, MembershipRepository, MessageKind,
    MessageRepository, MessageView, NewMessage, Sender, ServerEvent, Timestamp, UserId,
};

use super::ai_reply::AiReplyUseCase;
use super::error::SendMessageError;
use super::notifier::RoomNotifier;
use super::projector::MessageProjector;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    membership: Arc<dyn MembershipRepository>,
    messages: Arc<dyn MessageRepository>,
    file_store: Arc<dyn FileStore>,
    notifier: Arc<RoomNotifier>,
    projector: Arc<MessageProjector>,
    ai: Arc<AiReplyUseCase>,
    clock: Arc<dyn Clock>,
    /// Mentionable AI kinds, longest-match order is handled by the scanner.
    ai_kinds: Vec<AiKind>,
}

impl SendMessageUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        membership: Arc<dyn MembershipRepository>,
        messages: Arc<dyn MessageRepository>,
        file_store: Arc<dyn FileStore>,
        notifier: Arc<RoomNotifier>,
        projector: Arc<MessageProjector>,
        ai: Arc<AiReplyUseCase>,
        clock: Arc<dyn Clock>,
        ai_kinds: Vec<AiKind>,
    ) -> Self {
        Self {
            membership,
            messages,
            file_store,
            notifier,
            projector,
            ai,
            clock,
            ai_kinds,
        }
    }

    /// Persist and fan out one client-submitted message.
    ///
    /// Returns `Ok(None)` when the message was dropped without error
    /// (text that trims to nothing).
    pub async fn execute(
        &self,
        user: &UserId,
        kind: MessageKind,
        content: &str,
        file_id: Option<FileId>,
    ) -> Result<Option<MessageView>, SendMessageError> {
        let Some(room) = self.membership.current_room(user).await? else {
            return Err(SendMessageError::NotInRoom);
        };

        let new = match kind {
            MessageKind::Text => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    tracing::debug!("Dropping empty text message from '{}'", user);
                    return Ok(None);
                }
                let scan = extract_mentions(trimmed, &self.ai_kinds);
                let mut new = NewMessage::new(
                    room.clone(),
                    Sender::User(user.clone()),
                    MessageKind::Text,
                    trimmed.to_string(),
                    Timestamp::new(self.clock.now_millis()),
                );
                new.mentions = scan
                    .kinds
                    .iter()
                    .map(|k| k.as_str().to_string())
                    .collect();

                let created = self.messages.create(new).await?;
                let view = self.projector.project(&created).await;
                self.notifier
                    .broadcast_to_room(&room, ServerEvent::Message(view.clone()))
                    .await;

                for kind in scan.kinds {
                    self.ai.spawn(room.clone(), kind, scan.stripped.clone());
                }
                return Ok(Some(view));
            }
            MessageKind::File => {
                let Some(file_id) = file_id else {
                    return Err(SendMessageError::MissingFile);
                };
                let projection = match self.file_store.get_file(&file_id).await? {
                    Some(projection) => projection,
                    None => {
                        return Err(SendMessageError::FileNotFound(
                            file_id.as_str().to_string(),
                        ));
                    }
                };

                let mut new = NewMessage::new(
                    room.clone(),
                    Sender::User(user.clone()),
                    MessageKind::File,
                    projection.original_name.clone(),
                    Timestamp::new(self.clock.now_millis()),
                );
                new.file = Some(file_id);
                new.metadata.insert(
                    "fileType".to_string(),
                    serde_json::Value::String(projection.mimetype.clone()),
                );
                new.metadata.insert(
                    "fileSize".to_string(),
                    serde_json::Value::from(projection.size),
                );
                new
            }
            MessageKind::System | MessageKind::Ai => {
                tracing::warn!("Rejecting client-submitted {:?} message from '{}'", kind, user);
                return Err(SendMessageError::UnsupportedType);
            }
        };

        let created = self.messages.create(new).await?;
        let view = self.projector.project(&created).await;
        self.notifier
            .broadcast_to_room(&room, ServerEvent::Message(view.clone()))
            .await;
        Ok(Some(view))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FileProjection;
    use crate::usecase::test_support::{drain, TestStack};

    #[tokio::test]
    async fn test_text_message_is_persisted_and_broadcast() {
        // テスト項目: テキスト送信が永続化され、在室メンバー全員に届く
        // given (前提条件): alice と bob が在室、bob は接続済み
        let stack = TestStack::new().await;
        let (room, alice, bob) = (stack.room("lobby"), stack.user("alice"), stack.user("bob"));
        stack.put_in_room(&alice, &room).await;
        stack.put_in_room(&bob, &room).await;
        let (_conn, mut rx_b) = stack.connect(&bob).await;

        // when (操作):
        let view = stack
            .send
            .execute(&alice, MessageKind::Text, "hello there", None)
            .await
            .unwrap()
            .unwrap();

        // then (期待する結果):
        assert_eq!(view.content, "hello there");
        let page = stack.messages.page_before(&room, None, 10).await.unwrap();
        assert_eq!(page.messages.len(), 1);
        let events = drain(&mut rx_b);
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::Message(v) if v.content == "hello there"
        )));
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_dropped_silently() {
        // テスト項目: 空白だけのテキストはエラーにならず捨てられる
        // given (前提条件):
        let stack = TestStack::new().await;
        let (room, alice) = (stack.room("lobby"), stack.user("alice"));
        stack.put_in_room(&alice, &room).await;

        // when (操作):
        let result = stack
            .send
            .execute(&alice, MessageKind::Text, "   \n\t ", None)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(result, None);
        let page = stack.messages.page_before(&room, None, 10).await.unwrap();
        assert!(page.messages.is_empty());
    }

    #[tokio::test]
    async fn test_send_without_room_fails() {
        // テスト項目: 在室していないユーザーの送信は NotInRoom
        // given (前提条件):
        let stack = TestStack::new().await;
        let alice = stack.user("alice");

        // when (操作):
        let result = stack
            .send
            .execute(&alice, MessageKind::Text, "hello", None)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::NotInRoom)));
    }

    #[tokio::test]
    async fn test_system_kind_from_client_is_rejected() {
        // テスト項目: クライアント発の system メッセージは拒否される
        // given (前提条件):
        let stack = TestStack::new().await;
        let (room, alice) = (stack.room("lobby"), stack.user("alice"));
        stack.put_in_room(&alice, &room).await;

        // when (操作):
        let result = stack
            .send
            .execute(&alice, MessageKind::System, "fake notice", None)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::UnsupportedType)));
    }

    #[tokio::test]
    async fn test_file_message_carries_file_projection() {
        // テスト項目: ファイル送信で本文が元のファイル名になり、
        //             配信ビューにファイル情報が付く
        // given (前提条件):
        let stack = TestStack::new().await;
        let (room, alice) = (stack.room("lobby"), stack.user("alice"));
        stack.put_in_room(&alice, &room).await;
        let file_id = stack
            .seed_file(FileProjection {
                filename: "a1b2c3.png".to_string(),
                original_name: "diagram.png".to_string(),
                mimetype: "image/png".to_string(),
                size: 2_048,
            })
            .await;

        // when (操作):
        let view = stack
            .send
            .execute(&alice, MessageKind::File, "", Some(file_id))
            .await
            .unwrap()
            .unwrap();

        // then (期待する結果):
        assert_eq!(view.content, "diagram.png");
        let file = view.file.unwrap();
        assert_eq!(file.mimetype, "image/png");
        assert_eq!(view.metadata.get("fileSize"), Some(&serde_json::json!(2048)));
    }

    #[tokio::test]
    async fn test_file_message_with_unknown_file_fails() {
        // テスト項目: 存在しないファイル参照は FileNotFound
        // given (前提条件):
        let stack = TestStack::new().await;
        let (room, alice) = (stack.room("lobby"), stack.user("alice"));
        stack.put_in_room(&alice, &room).await;
        let bogus = FileId::new("no-such-file".to_string()).unwrap();

        // when (操作):
        let result = stack
            .send
            .execute(&alice, MessageKind::File, "", Some(bogus))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_mention_records_and_triggers_ai_reply() {
        // テスト項目: @メンション付きテキストで mentions が記録され、
        //             AI 応答（開始イベントと ai メッセージ）が流れる
        // given (前提条件): alice が在室・接続済み
        let stack = TestStack::new().await;
        let (room, alice) = (stack.room("lobby"), stack.user("alice"));
        stack.put_in_room(&alice, &room).await;
        let (_conn, mut rx) = stack.connect(&alice).await;

        // when (操作):
        let view = stack
            .send
            .execute(&alice, MessageKind::Text, "@wayneAI what is Rust?", None)
            .await
            .unwrap()
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // then (期待する結果): 本文はそのまま、mentions に wayneAI
        assert_eq!(view.content, "@wayneAI what is Rust?");
        let page = stack.messages.page_before(&room, None, 10).await.unwrap();
        assert!(page.messages.iter().any(|m| {
            m.kind == MessageKind::Text && m.mentions == vec!["wayneAI".to_string()]
        }));
        // AI 応答は ai メッセージとして永続化される
        assert!(page.messages.iter().any(|m| m.kind == MessageKind::Ai));

        let events = drain(&mut rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, ServerEvent::AiMessageStart { ai_kind, .. } if ai_kind == "wayneAI")));
        assert!(events
            .iter()
            .any(|e| matches!(e, ServerEvent::AiMessageComplete { .. })));
    }
}
