//! Store and collaborator traits.
//!
//! The coordinator owns presence and membership state (ephemeral,
//! cluster-visible); messages, rooms, users and files belong to
//! external collaborators and are reached only through these narrow
//! contracts. Infrastructure provides the implementations (dependency
//! inversion).

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use thiserror::Error;

use super::model::{
    ConnectionId, FileId, FileProjection, Message, MessageId, MessagePage, NewMessage, Room,
    RoomId, UserId, UserProjection,
};

/// Errors surfaced by any store operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The referenced record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The underlying store call failed (transient or fatal).
    #[error("store operation failed: {0}")]
    Store(String),
}

/// Presence registry: `UserId -> ConnectionId`, one live connection per
/// user.
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// Register `conn` as the authoritative connection for `user`,
    /// returning the previous one if any. The write is a single atomic
    /// overwrite; no further locking is required for duplicate-login
    /// arbitration.
    async fn register(
        &self,
        user: &UserId,
        conn: ConnectionId,
    ) -> Result<Option<ConnectionId>, RepositoryError>;

    /// Current authoritative connection for `user`.
    async fn current(&self, user: &UserId) -> Result<Option<ConnectionId>, RepositoryError>;

    /// Release the registry entry, but only if it still equals `conn`
    /// (stale-write guard). Returns whether the entry was removed.
    async fn release(&self, user: &UserId, conn: ConnectionId) -> Result<bool, RepositoryError>;
}

/// Room membership: `UserId -> RoomId` plus per-room member sets.
///
/// The per-user mapping is authoritative for "current room"; the member
/// set is its broadcast-routing mirror and self-heals on leave.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn current_room(&self, user: &UserId) -> Result<Option<RoomId>, RepositoryError>;

    async fn set_current_room(&self, user: &UserId, room: &RoomId) -> Result<(), RepositoryError>;

    async fn clear_current_room(&self, user: &UserId) -> Result<(), RepositoryError>;

    /// Add `user` to the room's member set (idempotent).
    async fn add_member(&self, room: &RoomId, user: &UserId) -> Result<(), RepositoryError>;

    /// Remove `user` from the room's member set; removing an absent
    /// member is a no-op.
    async fn remove_member(&self, room: &RoomId, user: &UserId) -> Result<(), RepositoryError>;

    async fn members(&self, room: &RoomId) -> Result<Vec<UserId>, RepositoryError>;
}

/// Persisted room records (collaborator-owned).
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn get_room(&self, room: &RoomId) -> Result<Option<Room>, RepositoryError>;

    async fn add_participant(&self, room: &RoomId, user: &UserId) -> Result<(), RepositoryError>;

    async fn remove_participant(&self, room: &RoomId, user: &UserId)
        -> Result<(), RepositoryError>;
}

/// Message store facade: the coordinator's only path to durable
/// message state.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a message; the store assigns the id and appends it to
    /// the room's sequence.
    async fn create(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    async fn get(&self, id: &MessageId) -> Result<Option<Message>, RepositoryError>;

    /// Fetch up to `limit` messages strictly older than `before`
    /// (or the newest ones when `before` is `None`), chronologically
    /// ordered within the page.
    async fn page_before(
        &self,
        room: &RoomId,
        before: Option<i64>,
        limit: usize,
    ) -> Result<MessagePage, RepositoryError>;

    async fn mark_read(
        &self,
        user: &UserId,
        room: &RoomId,
        ids: &[MessageId],
    ) -> Result<(), RepositoryError>;

    /// Idempotent set insert into (message, key).
    async fn add_reaction(
        &self,
        id: &MessageId,
        key: &str,
        user: &UserId,
    ) -> Result<(), RepositoryError>;

    /// Idempotent set removal from (message, key).
    async fn remove_reaction(
        &self,
        id: &MessageId,
        key: &str,
        user: &UserId,
    ) -> Result<(), RepositoryError>;

    /// The full, authoritative reaction map for a message.
    async fn get_reactions(
        &self,
        id: &MessageId,
    ) -> Result<BTreeMap<String, BTreeSet<UserId>>, RepositoryError>;
}

/// User lookup collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_id(
        &self,
        user: &UserId,
    ) -> Result<Option<UserProjection>, RepositoryError>;
}

/// File metadata collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn get_file(&self, file: &FileId) -> Result<Option<FileProjection>, RepositoryError>;
}
