//! MessagePusher abstraction: delivery of server events to attached
//! connections.
//!
//! The pusher owns the `ConnectionId -> sender` map and the doomed-set
//! used by duplicate-login takeover. Socket creation stays in the UI
//! layer; this trait only moves events.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::event::ServerEvent;
use super::model::ConnectionId;

/// Channel over which a connection's pump task receives events.
pub type PusherChannel = mpsc::UnboundedSender<ServerEvent>;

#[derive(Debug, Error)]
pub enum MessagePushError {
    /// No sender is attached for this connection.
    #[error("connection '{0}' is not attached")]
    ConnectionNotFound(String),

    /// The connection's channel rejected the event.
    #[error("failed to push event: {0}")]
    PushFailed(String),
}

#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Attach a connection's outbound channel.
    async fn register_connection(&self, conn: ConnectionId, sender: PusherChannel);

    /// Detach a connection; its doomed marker (if any) is cleared too.
    async fn unregister_connection(&self, conn: ConnectionId);

    /// Whether a sender is currently attached for this connection.
    async fn is_attached(&self, conn: ConnectionId) -> bool;

    /// Phase one of duplicate-login takeover: the connection stays
    /// attached but is marked for termination.
    async fn mark_doomed(&self, conn: ConnectionId);

    /// Whether this connection has been marked for termination.
    async fn is_doomed(&self, conn: ConnectionId) -> bool;

    /// Phase two of takeover: drop the connection's sender, which ends
    /// its pump task and tears the socket down. The doomed marker is
    /// kept so the teardown path can tell a takeover from a plain
    /// disconnect.
    async fn kill(&self, conn: ConnectionId);

    /// Push one event to one connection.
    async fn push_to(&self, conn: ConnectionId, event: ServerEvent)
        -> Result<(), MessagePushError>;

    /// Best-effort fan-out; individual send failures are logged and
    /// skipped, never surfaced.
    async fn broadcast(&self, targets: Vec<ConnectionId>, event: ServerEvent);
}
