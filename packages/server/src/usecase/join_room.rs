//! UseCase: ルーム参加処理
//!
//! 参加は冪等（同じルームへの再参加は成功扱い、システムメッセージも
//! 参加者エントリも重複しない）。別ルーム在室中なら先に退出してから
//! 参加する。参加直後の初回履歴ページは「joined」システムメッセージを
//! 永続化する *前* に取得する。空ルームに入ったユーザーの
//! `joinRoomSuccess` には自分の参加通知が混ざらない。

use std::sync::Arc;

use chanoma_shared::time::Clock;

use crate::domain::{
    MembershipRepository, MessageKind, MessageRepository, MessageView, NewMessage, RoomId,
    RoomStore, Sender, ServerEvent, Timestamp, UserDirectory, UserId, UserProjection,
};

use super::error::JoinRoomError;
use super::leave_room::{LeaveNotice, LeaveRoomUseCase};
use super::load_history::HistoryLoader;
use super::notifier::RoomNotifier;
use super::projector::MessageProjector;

/// Payload for the joiner's `joinRoomSuccess` reply.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub room_id: RoomId,
    pub participants: Vec<UserProjection>,
    pub messages: Vec<MessageView>,
    pub has_more: bool,
    pub oldest_timestamp: Option<i64>,
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    membership: Arc<dyn MembershipRepository>,
    room_store: Arc<dyn RoomStore>,
    messages: Arc<dyn MessageRepository>,
    directory: Arc<dyn UserDirectory>,
    history: Arc<HistoryLoader>,
    leave: Arc<LeaveRoomUseCase>,
    notifier: Arc<RoomNotifier>,
    projector: Arc<MessageProjector>,
    clock: Arc<dyn Clock>,
    page_size: usize,
}

impl JoinRoomUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        membership: Arc<dyn MembershipRepository>,
        room_store: Arc<dyn RoomStore>,
        messages: Arc<dyn MessageRepository>,
        directory: Arc<dyn UserDirectory>,
        history: Arc<HistoryLoader>,
        leave: Arc<LeaveRoomUseCase>,
        notifier: Arc<RoomNotifier>,
        projector: Arc<MessageProjector>,
        clock: Arc<dyn Clock>,
        page_size: usize,
    ) -> Self {
        Self {
            membership,
            room_store,
            messages,
            directory,
            history,
            leave,
            notifier,
            projector,
            clock,
            page_size,
        }
    }

    pub async fn execute(
        &self,
        user: &UserId,
        room_id: &RoomId,
    ) -> Result<JoinOutcome, JoinRoomError> {
        if self.room_store.get_room(room_id).await?.is_none() {
            return Err(JoinRoomError::RoomNotFound(room_id.as_str().to_string()));
        }

        let current = self.membership.current_room(user).await?;
        let rejoining = current.as_ref() == Some(room_id);

        if let Some(other) = current
            && !rejoining
        {
            tracing::debug!("User '{}' switching from room '{}' to '{}'", user, other, room_id);
            if let Err(e) = self.leave.execute(user, LeaveNotice::Left).await {
                tracing::warn!("Leave before join failed for '{}': {}", user, e);
            }
        }

        // First page before the join notice is persisted, so an empty
        // room yields an empty page for the joiner.
        let page = match self
            .history
            .load_page(room_id, user, None, self.page_size)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("Initial history load failed for '{}': {}", room_id, e);
                super::load_history::HistoryPage::empty()
            }
        };

        if !rejoining {
            self.membership.add_member(room_id, user).await?;
            self.membership.set_current_room(user, room_id).await?;
            if let Err(e) = self.room_store.add_participant(room_id, user).await {
                tracing::warn!(
                    "Failed to mirror '{}' into room record '{}': {}",
                    user,
                    room_id,
                    e
                );
            }

            self.append_join_notice(user, room_id).await;
        } else {
            tracing::debug!("User '{}' re-joined room '{}', treating as success", user, room_id);
        }

        let participants = self.notifier.participants_of(room_id).await?;
        if !rejoining {
            self.notifier
                .broadcast_to_room(
                    room_id,
                    ServerEvent::ParticipantsUpdate {
                        participants: participants.clone(),
                    },
                )
                .await;
        }

        tracing::info!("User '{}' joined room '{}'", user, room_id);
        Ok(JoinOutcome {
            room_id: room_id.clone(),
            participants,
            messages: page.messages,
            has_more: page.has_more,
            oldest_timestamp: page.oldest_timestamp,
        })
    }

    async fn append_join_notice(&self, user: &UserId, room: &RoomId) {
        let name = match self.directory.get_user_by_id(user).await {
            Ok(Some(profile)) => profile.name,
            _ => user.as_str().to_string(),
        };
        let new = NewMessage::new(
            room.clone(),
            Sender::System,
            MessageKind::System,
            format!("{name} joined the room."),
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
                tracing::warn!("Failed to persist join notice for '{}': {}", room, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{drain, TestStack};

    #[tokio::test]
    async fn test_join_empty_room_returns_empty_page() {
        // テスト項目: 空ルームへの参加は participants=[自分], messages=[] を返す
        // given (前提条件):
        let stack = TestStack::new().await;
        let (room, alice) = (stack.room("lobby"), stack.user("alice"));
        stack.seed_room(&room).await;
        stack.seed_user(&alice, "Alice").await;

        // when (操作):
        let outcome = stack.join.execute(&alice, &room).await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome.participants.len(), 1);
        assert_eq!(outcome.participants[0].id, "alice");
        assert!(outcome.messages.is_empty());
        assert!(!outcome.has_more);
        assert_eq!(
            stack.membership.current_room(&alice).await.unwrap(),
            Some(room)
        );
    }

    #[tokio::test]
    async fn test_join_unknown_room_fails() {
        // テスト項目: 存在しないルームへの参加は RoomNotFound
        // given (前提条件):
        let stack = TestStack::new().await;
        let (room, alice) = (stack.room("nowhere"), stack.user("alice"));

        // when (操作):
        let result = stack.join.execute(&alice, &room).await;

        // then (期待する結果):
        assert!(matches!(result, Err(JoinRoomError::RoomNotFound(_))));
        assert_eq!(stack.membership.current_room(&alice).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejoin_same_room_is_idempotent() {
        // テスト項目: 同一ルームへの再参加でシステムメッセージも
        //             参加者エントリも重複しない
        // given (前提条件):
        let stack = TestStack::new().await;
        let (room, alice) = (stack.room("lobby"), stack.user("alice"));
        stack.seed_room(&room).await;
        stack.join.execute(&alice, &room).await.unwrap();

        // when (操作):
        let outcome = stack.join.execute(&alice, &room).await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome.participants.len(), 1);
        assert_eq!(stack.membership.members(&room).await.unwrap().len(), 1);
        // システムメッセージは最初の参加の1件だけ
        let page = stack.messages.page_before(&room, None, 10).await.unwrap();
        assert_eq!(page.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_join_other_room_leaves_first() {
        // テスト項目: 別ルーム参加時は先に既存ルームから退出する
        // given (前提条件): alice は lobby に在室
        let stack = TestStack::new().await;
        let (lobby, annex, alice) =
            (stack.room("lobby"), stack.room("annex"), stack.user("alice"));
        stack.seed_room(&lobby).await;
        stack.seed_room(&annex).await;
        stack.join.execute(&alice, &lobby).await.unwrap();

        // when (操作):
        stack.join.execute(&alice, &annex).await.unwrap();

        // then (期待する結果): マッピングと両ルームのメンバー集合が整合
        assert_eq!(
            stack.membership.current_room(&alice).await.unwrap(),
            Some(annex.clone())
        );
        assert!(stack.membership.members(&lobby).await.unwrap().is_empty());
        assert_eq!(stack.membership.members(&annex).await.unwrap().len(), 1);
        // lobby には退出のシステムメッセージが残る
        let page = stack.messages.page_before(&lobby, None, 10).await.unwrap();
        assert!(
            page.messages
                .iter()
                .any(|m| m.content.contains("left the room"))
        );
    }

    #[tokio::test]
    async fn test_join_broadcasts_notice_and_participants() {
        // テスト項目: 参加で既存メンバーに参加通知と参加者リストが届く
        // given (前提条件): alice が在室・接続済み
        let stack = TestStack::new().await;
        let (room, alice, bob) = (stack.room("lobby"), stack.user("alice"), stack.user("bob"));
        stack.seed_room(&room).await;
        stack.join.execute(&alice, &room).await.unwrap();
        let (_conn, mut rx_a) = stack.connect(&alice).await;

        // when (操作):
        stack.join.execute(&bob, &room).await.unwrap();

        // then (期待する結果): システムメッセージと 2 名の participantsUpdate
        let events = drain(&mut rx_a);
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::Message(view) if view.kind == MessageKind::System
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            ServerEvent::ParticipantsUpdate { participants } if participants.len() == 2
        )));
    }
}
