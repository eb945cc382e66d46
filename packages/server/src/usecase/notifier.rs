//! Room-scoped event routing.
//!
//! Resolves a room's member set through the presence registry down to
//! live connections and fans events out. Broadcast is best-effort and
//! fire-and-forget relative to whatever triggered it; members without a
//! live connection are skipped.

use std::sync::Arc;

use crate::domain::{
    ConnectionId, MembershipRepository, MessagePusher, PresenceRepository, RepositoryError,
    RoomId, ServerEvent, UserDirectory, UserId, UserProjection,
};

pub struct RoomNotifier {
    membership: Arc<dyn MembershipRepository>,
    presence: Arc<dyn PresenceRepository>,
    pusher: Arc<dyn MessagePusher>,
    directory: Arc<dyn UserDirectory>,
}

impl RoomNotifier {
    pub fn new(
        membership: Arc<dyn MembershipRepository>,
        presence: Arc<dyn PresenceRepository>,
        pusher: Arc<dyn MessagePusher>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            membership,
            presence,
            pusher,
            directory,
        }
    }

    /// Live connections of a room's current members.
    pub async fn connections_in(&self, room: &RoomId) -> Vec<ConnectionId> {
        let members = match self.membership.members(room).await {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!("Failed to resolve members of room '{}': {}", room, e);
                return Vec::new();
            }
        };

        let mut connections = Vec::with_capacity(members.len());
        for member in &members {
            match self.presence.current(member).await {
                Ok(Some(conn)) => connections.push(conn),
                Ok(None) => {
                    tracing::debug!("Member '{}' has no live connection, skipping", member);
                }
                Err(e) => {
                    tracing::warn!("Presence lookup failed for '{}': {}", member, e);
                }
            }
        }
        connections
    }

    /// Fan an event out to every live connection in a room.
    pub async fn broadcast_to_room(&self, room: &RoomId, event: ServerEvent) {
        let targets = self.connections_in(room).await;
        self.pusher.broadcast(targets, event).await;
    }

    /// Push an event to one user's current connection, if any.
    pub async fn push_to_user(&self, user: &UserId, event: ServerEvent) {
        match self.presence.current(user).await {
            Ok(Some(conn)) => {
                if let Err(e) = self.pusher.push_to(conn, event).await {
                    tracing::debug!("Push to '{}' failed: {}", user, e);
                }
            }
            Ok(None) => {
                tracing::debug!("User '{}' has no live connection, dropping event", user);
            }
            Err(e) => {
                tracing::warn!("Presence lookup failed for '{}': {}", user, e);
            }
        }
    }

    /// Member list projected to lightweight user records, sorted by id
    /// for consistent ordering.
    pub async fn participants_of(
        &self,
        room: &RoomId,
    ) -> Result<Vec<UserProjection>, RepositoryError> {
        let mut members = self.membership.members(room).await?;
        members.sort();

        let mut participants = Vec::with_capacity(members.len());
        for member in &members {
            let projection = match self.directory.get_user_by_id(member).await {
                Ok(Some(user)) => user,
                Ok(None) | Err(_) => UserProjection::unknown(member.as_str()),
            };
            participants.push(projection);
        }
        Ok(participants)
    }

    /// Broadcast the refreshed participant list to a room.
    pub async fn broadcast_participants(&self, room: &RoomId) {
        match self.participants_of(room).await {
            Ok(participants) => {
                self.broadcast_to_room(room, ServerEvent::ParticipantsUpdate { participants })
                    .await;
            }
            Err(e) => {
                tracing::warn!("Failed to build participant list for '{}': {}", room, e);
            }
        }
    }
}
