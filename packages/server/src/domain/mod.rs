//! Domain layer: value objects, entities, pure functions, and the
//! traits the rest of the system is wired through.
//!
//! Infrastructure implements these traits (dependency inversion); the
//! usecase layer depends only on what is defined here.

mod event;
mod generator;
mod mention;
mod model;
mod pusher;
mod repository;

pub use event::{ClientCommand, MessageView, ReactionAction, ServerEvent};
pub use generator::{AiCompletion, AiError, AiGenerator};
pub use mention::{MentionScan, extract_mentions};
pub use model::{
    AiKind, ConnectionId, DisconnectReason, FileId, FileProjection, InvalidIdError, Message,
    MessageId, MessageKind, MessagePage, NewMessage, Room, RoomId, Sender, Timestamp,
    UserId, UserProjection,
};
pub use pusher::{MessagePushError, MessagePusher, PusherChannel};
pub use repository::{
    FileStore, MembershipRepository, MessageRepository, PresenceRepository, RepositoryError,
    RoomStore, UserDirectory,
};

#[cfg(test)]
pub use generator::MockAiGenerator;
#[cfg(test)]
pub use repository::{MockFileStore, MockUserDirectory};
