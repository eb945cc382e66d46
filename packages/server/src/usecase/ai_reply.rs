//! UseCase: AI 応答の生成と配信
//!
//! 送信処理からは切り離されたバックグラウンドタスクとして走る。
//! 開始イベントは生成を await する前に配信し、クライアントが
//! タイピングインジケータを出せるようにする。生成失敗・永続化失敗は
//! どちらも aiMessageError としてルームに配信され、元のユーザー
//! メッセージには影響しない。

use std::sync::Arc;

use chanoma_shared::time::Clock;

use crate::domain::{
    AiGenerator, AiKind, MessageKind, MessageRepository, NewMessage, RoomId, Sender,
    ServerEvent, Timestamp,
};

use super::error::AiReplyError;
use super::notifier::RoomNotifier;

/// AI 応答のユースケース
pub struct AiReplyUseCase {
    messages: Arc<dyn MessageRepository>,
    notifier: Arc<RoomNotifier>,
    generator: Arc<dyn AiGenerator>,
    clock: Arc<dyn Clock>,
}

impl AiReplyUseCase {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        notifier: Arc<RoomNotifier>,
        generator: Arc<dyn AiGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            notifier,
            generator,
            clock,
        }
    }

    /// Run one reply generation in the background.
    pub fn spawn(self: &Arc<Self>, room: RoomId, kind: AiKind, query: String) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.execute(&room, &kind, &query).await {
                tracing::warn!("AI reply for '{}' in '{}' failed: {}", kind, room, e);
            }
        });
    }

    /// Generate and persist one AI reply, streaming lifecycle events
    /// to the room.
    pub async fn execute(
        &self,
        room: &RoomId,
        kind: &AiKind,
        query: &str,
    ) -> Result<(), AiReplyError> {
        let started_at = self.clock.now_millis();
        let session_id = format!("{}-{}", kind, started_at);

        self.notifier
            .broadcast_to_room(
                room,
                ServerEvent::AiMessageStart {
                    session_id: session_id.clone(),
                    ai_kind: kind.as_str().to_string(),
                    timestamp: started_at,
                },
            )
            .await;

        let completion = match self.generator.generate(query, kind).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!("Generation failed for '{}': {}", kind, e);
                self.notifier
                    .broadcast_to_room(
                        room,
                        ServerEvent::AiMessageError {
                            session_id,
                            error: e.to_string(),
                        },
                    )
                    .await;
                return Ok(());
            }
        };

        let finished_at = self.clock.now_millis();
        let mut new = NewMessage::new(
            room.clone(),
            Sender::Ai(kind.clone()),
            MessageKind::Ai,
            completion.content.clone(),
            Timestamp::new(finished_at),
        );
        new.ai_kind = Some(kind.clone());
        new.metadata.insert(
            "query".to_string(),
            serde_json::Value::String(query.to_string()),
        );
        new.metadata.insert(
            "durationMs".to_string(),
            serde_json::Value::from(finished_at - started_at),
        );
        new.metadata.insert(
            "promptTokens".to_string(),
            serde_json::Value::from(completion.prompt_tokens),
        );
        new.metadata.insert(
            "completionTokens".to_string(),
            serde_json::Value::from(completion.completion_tokens),
        );

        let created = match self.messages.create(new).await {
            Ok(created) => created,
            Err(e) => {
                self.notifier
                    .broadcast_to_room(
                        room,
                        ServerEvent::AiMessageError {
                            session_id,
                            error: "Failed to store the generated reply.".to_string(),
                        },
                    )
                    .await;
                return Err(AiReplyError::Store(e));
            }
        };

        self.notifier
            .broadcast_to_room(
                room,
                ServerEvent::AiMessageComplete {
                    session_id,
                    message_id: created.id.as_str().to_string(),
                    content: completion.content,
                    timestamp: finished_at,
                },
            )
            .await;

        tracing::info!(
            "AI reply from '{}' delivered to '{}' in {}ms",
            kind,
            room,
            finished_at - started_at
        );
        Ok(())
    }
}
