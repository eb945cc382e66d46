//! UseCase: 接続終了処理
//!
//! トランスポートの切断・クライアント主導のクローズ・重複ログインの
//! 乗っ取りの3経路を1つに集約する。プレゼンスの解放はガード付き
//! （現在の接続 ID が一致する場合のみ削除）で、解放が成立しなかった
//! 切断は「既に新接続に乗っ取られた古い接続」なので、ルームの
//! 後片付けを一切行わない。

use std::sync::Arc;

use crate::domain::{
    ConnectionId, DisconnectReason, MessagePusher, PresenceRepository, UserId,
};

use super::leave_room::{LeaveNotice, LeaveRoomUseCase};

/// 切断のユースケース
pub struct DisconnectParticipantUseCase {
    presence: Arc<dyn PresenceRepository>,
    pusher: Arc<dyn MessagePusher>,
    leave: Arc<LeaveRoomUseCase>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        presence: Arc<dyn PresenceRepository>,
        pusher: Arc<dyn MessagePusher>,
        leave: Arc<LeaveRoomUseCase>,
    ) -> Self {
        Self {
            presence,
            pusher,
            leave,
        }
    }

    /// Tear down a finished connection.
    ///
    /// Always detaches the push channel. Room membership is torn down
    /// only when the guarded presence release succeeds, so a takeover
    /// never produces a spurious leave for the user who is still (on a
    /// new connection) in the room.
    pub async fn execute(&self, user: &UserId, conn: ConnectionId, reason: DisconnectReason) {
        // A doomed connection reaching here means the grace task or
        // the peer closed it after a takeover.
        let reason = if self.pusher.is_doomed(conn).await {
            DisconnectReason::Takeover
        } else {
            reason
        };

        self.pusher.unregister_connection(conn).await;

        let released = match self.presence.release(user, conn).await {
            Ok(released) => released,
            Err(e) => {
                tracing::warn!("Presence release failed for '{}': {}", user, e);
                false
            }
        };
        if !released {
            tracing::debug!(
                "Connection {} of '{}' was already superseded, skipping room teardown",
                conn,
                user
            );
            return;
        }

        let notice = match reason {
            DisconnectReason::Transport => LeaveNotice::Disconnected,
            DisconnectReason::Client | DisconnectReason::Takeover => LeaveNotice::Silent,
        };
        if let Err(e) = self.leave.execute(user, notice).await {
            tracing::warn!("Room teardown after disconnect of '{}' failed: {}", user, e);
        }

        tracing::info!("Connection {} of '{}' closed ({:?})", conn, user, reason);
    }
}
