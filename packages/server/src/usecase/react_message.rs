//! UseCase: リアクションの付与・削除
//!
//! 追加・削除はどちらも冪等。更新後はメッセージの属するルームに
//! リアクション全量（キー → ユーザー ID 集合）を配信する。差分では
//! なく全量を配るので、イベントの取りこぼしがあっても次の更新で
//! 収束する。

use std::sync::Arc;

use crate::domain::{
    MessageId, MessageRepository, ReactionAction, ServerEvent, UserId,
};

use super::error::ReactionError;
use super::notifier::RoomNotifier;

/// リアクション更新のユースケース
pub struct ReactMessageUseCase {
    messages: Arc<dyn MessageRepository>,
    notifier: Arc<RoomNotifier>,
}

impl ReactMessageUseCase {
    pub fn new(messages: Arc<dyn MessageRepository>, notifier: Arc<RoomNotifier>) -> Self {
        Self { messages, notifier }
    }

    pub async fn execute(
        &self,
        user: &UserId,
        message_id: &MessageId,
        reaction: &str,
        action: ReactionAction,
    ) -> Result<(), ReactionError> {
        if reaction.trim().is_empty() {
            return Err(ReactionError::InvalidReaction);
        }

        let Some(message) = self.messages.get(message_id).await? else {
            return Err(ReactionError::MessageNotFound(
                message_id.as_str().to_string(),
            ));
        };

        match action {
            ReactionAction::Add => {
                self.messages.add_reaction(message_id, reaction, user).await?;
            }
            ReactionAction::Remove => {
                self.messages
                    .remove_reaction(message_id, reaction, user)
                    .await?;
            }
        }

        // Re-read the full aggregate after the write.
        let reactions = self.messages.get_reactions(message_id).await?;
        let payload = reactions
            .into_iter()
            .map(|(key, users)| {
                (
                    key,
                    users.into_iter().map(|u| u.as_str().to_string()).collect(),
                )
            })
            .collect();

        self.notifier
            .broadcast_to_room(
                &message.room_id,
                ServerEvent::MessageReactionUpdate {
                    message_id: message_id.as_str().to_string(),
                    reactions: payload,
                },
            )
            .await;

        tracing::debug!(
            "User '{}' {:?} reaction '{}' on '{}'",
            user,
            action,
            reaction,
            message_id
        );
        Ok(())
    }
}
