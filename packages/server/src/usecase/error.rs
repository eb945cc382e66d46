//! UseCase error types.
//!
//! Each handler converts these into a structured `error` event for the
//! originating connection; they never tear down other connections.

use thiserror::Error;

use crate::domain::RepositoryError;

/// Connection/authentication failures. These fail closed: a presence
/// store error must never let two connections silently coexist.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Unknown user, bad token, or a directory failure during lookup.
    #[error("authentication failed")]
    Authentication,

    /// The presence registry could not be read or written.
    #[error("presence registry unavailable: {0}")]
    Presence(String),
}

#[derive(Debug, Error)]
pub enum JoinRoomError {
    #[error("room '{0}' does not exist")]
    RoomNotFound(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum LeaveRoomError {
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum SendMessageError {
    /// Sender is not currently joined to any room.
    #[error("sender is not in a room")]
    NotInRoom,

    /// Only text and file messages may be submitted by clients.
    #[error("unsupported message type")]
    UnsupportedType,

    /// A file message without a file reference.
    #[error("file message requires a file reference")]
    MissingFile,

    /// The referenced file record does not exist.
    #[error("file '{0}' not found")]
    FileNotFound(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// History loader failures. A timeout is distinct from other store
/// failures; both are retried internally and surfaced only once the
/// retry budget is spent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// A request for the same (room, user) is already in flight; this
    /// one was dropped, not queued.
    #[error("history load already in progress")]
    LoadInProgress,

    #[error("history load timed out after {attempts} attempts")]
    Timeout { attempts: u32 },

    #[error("history load failed after {attempts} attempts: {message}")]
    Store { attempts: u32, message: String },
}

#[derive(Debug, Error)]
pub enum ReactionError {
    #[error("reaction key must not be empty")]
    InvalidReaction,

    #[error("message '{0}' not found")]
    MessageNotFound(String),

    #[error(transparent)]
    Store(#[from] RepositoryError),
}

#[derive(Debug, Error)]
pub enum AiReplyError {
    /// Persisting the completed reply failed; the failure event has
    /// already been broadcast.
    #[error(transparent)]
    Store(#[from] RepositoryError),
}
