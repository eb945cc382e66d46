//! UseCase: ルーム退出処理
//!
//! 明示的な退出・切断・重複ログイン乗っ取りの3経路すべてがこの
//! ユースケースに合流する。ユーザー→ルームのマッピングが正であり、
//! ミラー（メンバー集合・Room レコードの参加者集合）の更新失敗は
//! ログに留めて致命にしない（自己修復前提）。

use std::sync::Arc;

use chanoma_shared::time::Clock;

use crate::domain::{
    MembershipRepository, MessageKind, MessageRepository, NewMessage, RoomId, RoomStore, Sender,
    ServerEvent, Timestamp, UserDirectory, UserId,
};

use super::error::LeaveRoomError;
use super::notifier::RoomNotifier;
use super::projector::MessageProjector;

/// What (if anything) to tell the room about the departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveNotice {
    /// Explicit leave: "X left the room."
    Left,
    /// Transport loss: "X disconnected."
    Disconnected,
    /// No system message (clean client close, takeover teardown).
    Silent,
}

/// ルーム退出のユースケース
pub struct LeaveRoomUseCase {
    membership: Arc<dyn MembershipRepository>,
    room_store: Arc<dyn RoomStore>,
    messages: Arc<dyn MessageRepository>,
    directory: Arc<dyn UserDirectory>,
    notifier: Arc<RoomNotifier>,
    projector: Arc<MessageProjector>,
    clock: Arc<dyn Clock>,
}

impl LeaveRoomUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        membership: Arc<dyn MembershipRepository>,
        room_store: Arc<dyn RoomStore>,
        messages: Arc<dyn MessageRepository>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<RoomNotifier>,
        projector: Arc<MessageProjector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            membership,
            room_store,
            messages,
            directory,
            notifier,
            projector,
            clock,
        }
    }

    /// Remove the user from their current room, if any.
    ///
    /// Leaving while not in a room is a silent no-op (defends against
    /// duplicate/late leave events). Returns the room that was left.
    pub async fn execute(
        &self,
        user: &UserId,
        notice: LeaveNotice,
    ) -> Result<Option<RoomId>, LeaveRoomError> {
        let Some(room) = self.membership.current_room(user).await? else {
            tracing::debug!("User '{}' left without being in a room, ignoring", user);
            return Ok(None);
        };

        // Authoritative mapping first; mirrors after.
        self.membership.clear_current_room(user).await?;
        if let Err(e) = self.membership.remove_member(&room, user).await {
            tracing::warn!("Failed to remove '{}' from member set of '{}': {}", user, room, e);
        }
        if let Err(e) = self.room_store.remove_participant(&room, user).await {
            tracing::warn!(
                "Failed to remove '{}' from room record '{}': {}",
                user,
                room,
                e
            );
        }

        if let Some(text) = self.notice_text(user, notice).await {
            self.append_system_notice(&room, text).await;
        }

        self.notifier.broadcast_participants(&room).await;

        tracing::info!("User '{}' left room '{}'", user, room);
        Ok(Some(room))
    }

    async fn notice_text(&self, user: &UserId, notice: LeaveNotice) -> Option<String> {
        let verb = match notice {
            LeaveNotice::Left => "left the room.",
            LeaveNotice::Disconnected => "disconnected.",
            LeaveNotice::Silent => return None,
        };
        let name = match self.directory.get_user_by_id(user).await {
            Ok(Some(profile)) => profile.name,
            _ => user.as_str().to_string(),
        };
        Some(format!("{name} {verb}"))
    }

    async fn append_system_notice(&self, room: &RoomId, text: String) {
        let new = NewMessage::new(
            room.clone(),
            Sender::System,
            MessageKind::System,
            text,
            Timestamp::new(self.clock.now_millis()),
        );
        match self.messages.create(new).await {
            Ok(created) => {
                let view = self.projector.project(&created).await;
                self.notifier
                    .broadcast_to_room(room, ServerEvent::Message(view))
                    .await;
            }
            Err(e) => {
                tracing::warn!("Failed to persist system notice for '{}': {}", room, e);
            }
        }
    }
}
