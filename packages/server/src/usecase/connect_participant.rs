//! UseCase: 接続確立と重複ログイン調停
//!
//! 認証はフェイルクローズド：ディレクトリ障害やプレゼンスストア障害は
//! すべて接続拒否になる（同一ユーザーの二重接続を黙って共存させない）。
//! 重複ログインは二段階で処理する：旧接続に `duplicate_login` を通知して
//! doomed マークを付け、レジストリは即座に新接続で上書きし、猶予時間
//! 経過後もまだ残っていれば `session_ended` を送って強制切断する。
//! レジストリ上書きが先に行われるため、猶予中に旧接続が何をしようと
//! 既に権威を失った接続としての動作にしかならない。

use std::sync::Arc;
use std::time::Duration;

use chanoma_shared::time::Clock;

use crate::domain::{
    ConnectionId, MessagePusher, PresenceRepository, PusherChannel, ServerEvent, UserDirectory,
    UserId, UserProjection,
};

use super::error::ConnectError;

/// Transport metadata forwarded to the overtaken connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionDetails {
    pub device_info: String,
    pub ip_address: String,
}

/// 接続確立のユースケース
pub struct ConnectParticipantUseCase {
    presence: Arc<dyn PresenceRepository>,
    directory: Arc<dyn UserDirectory>,
    pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    /// Grace window before a doomed connection is force-disconnected.
    grace: Duration,
}

impl ConnectParticipantUseCase {
    pub fn new(
        presence: Arc<dyn PresenceRepository>,
        directory: Arc<dyn UserDirectory>,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        grace: Duration,
    ) -> Self {
        Self {
            presence,
            directory,
            pusher,
            clock,
            grace,
        }
    }

    /// Authenticate and register a new connection.
    ///
    /// Returns the resolved user profile. Any prior live connection for
    /// the same user is notified and scheduled for forced termination.
    pub async fn execute(
        &self,
        user: &UserId,
        conn: ConnectionId,
        sender: PusherChannel,
        details: ConnectionDetails,
    ) -> Result<UserProjection, ConnectError> {
        let profile = match self.directory.get_user_by_id(user).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                tracing::warn!("Rejecting connection for unknown user '{}'", user);
                return Err(ConnectError::Authentication);
            }
            Err(e) => {
                tracing::warn!("Directory lookup failed for '{}', failing closed: {}", user, e);
                return Err(ConnectError::Authentication);
            }
        };

        self.pusher.register_connection(conn, sender).await;

        // The atomic overwrite IS the arbitration; everything after
        // this point acts on a connection that has already lost.
        let previous = match self.presence.register(user, conn).await {
            Ok(previous) => previous,
            Err(e) => {
                self.pusher.unregister_connection(conn).await;
                return Err(ConnectError::Presence(e.to_string()));
            }
        };

        if let Some(old) = previous
            && old != conn
            && self.pusher.is_attached(old).await
        {
            tracing::info!(
                "Duplicate login for '{}': connection {} replaces {}",
                user,
                conn,
                old
            );
            let notice = ServerEvent::DuplicateLogin {
                device_info: details.device_info.clone(),
                ip_address: details.ip_address.clone(),
                timestamp: self.clock.now_millis(),
            };
            if let Err(e) = self.pusher.push_to(old, notice).await {
                tracing::debug!("Could not notify overtaken connection {}: {}", old, e);
            }
            self.pusher.mark_doomed(old).await;
            self.schedule_forced_disconnect(old);
        }

        tracing::info!("User '{}' connected as {}", user, conn);
        Ok(profile)
    }

    fn schedule_forced_disconnect(&self, old: ConnectionId) {
        let pusher = Arc::clone(&self.pusher);
        let grace = self.grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if !pusher.is_attached(old).await {
                // Went away by itself during the grace window.
                return;
            }
            let farewell = ServerEvent::SessionEnded {
                reason: "duplicate_login".to_string(),
                message: "This session was ended because the account signed in from another device."
                    .to_string(),
            };
            if let Err(e) = pusher.push_to(old, farewell).await {
                tracing::debug!("Could not deliver session_ended to {}: {}", old, e);
            }
            tracing::info!("Force-disconnecting overtaken connection {}", old);
            pusher.kill(old).await;
        });
    }
}
