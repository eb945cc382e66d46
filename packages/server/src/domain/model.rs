//! Core value objects and entities of the chat coordinator.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when constructing an identifier from an empty string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("identifier must not be empty")]
pub struct InvalidIdError;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(String);

        impl $name {
            /// Create a new id; rejects empty (or whitespace-only) input.
            pub fn new(value: String) -> Result<Self, InvalidIdError> {
                if value.trim().is_empty() {
                    return Err(InvalidIdError);
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = InvalidIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identity of an authenticated user.
    UserId
);
string_id!(
    /// Identity of a chat room.
    RoomId
);
string_id!(
    /// Identity of a persisted message.
    MessageId
);
string_id!(
    /// Identity of an uploaded file record.
    FileId
);

impl MessageId {
    /// Generate a fresh message id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Identity of one live transport session.
///
/// A user has at most one authoritative connection at any instant; the
/// presence registry maps `UserId -> ConnectionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a connection id back out of its stored string form.
    pub fn parse(value: &str) -> Result<Self, InvalidIdError> {
        Uuid::parse_str(value).map(Self).map_err(|_| InvalidIdError)
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unix timestamp in UTC milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Recognized AI identifier (e.g. `wayneAI`), configuration-enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AiKind(String);

impl AiKind {
    pub fn new(value: String) -> Result<Self, InvalidIdError> {
        if value.trim().is_empty() {
            return Err(InvalidIdError);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who produced a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sender {
    User(UserId),
    System,
    Ai(AiKind),
}

/// Message type tag, mirrored on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    File,
    System,
    Ai,
}

/// A persisted chat message.
///
/// Immutable once created except for the reader list, the reaction map
/// and the soft-delete flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender: Sender,
    pub kind: MessageKind,
    pub content: String,
    pub file: Option<FileId>,
    pub ai_kind: Option<AiKind>,
    pub timestamp: Timestamp,
    pub mentions: Vec<String>,
    pub readers: BTreeSet<UserId>,
    pub reactions: BTreeMap<String, BTreeSet<UserId>>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub deleted: bool,
}

/// Fields for creating a message; the repository assigns the id.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub sender: Sender,
    pub kind: MessageKind,
    pub content: String,
    pub file: Option<FileId>,
    pub ai_kind: Option<AiKind>,
    pub timestamp: Timestamp,
    pub mentions: Vec<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl NewMessage {
    /// Convenience constructor for a plain message without file/ai fields.
    pub fn new(room_id: RoomId, sender: Sender, kind: MessageKind, content: String, timestamp: Timestamp) -> Self {
        Self {
            room_id,
            sender,
            kind,
            content,
            file: None,
            ai_kind: None,
            timestamp,
            mentions: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// One backward page of a room's history.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
    /// Timestamp of the oldest message in this page; cursor for the next
    /// backward request. `None` for an empty page.
    pub oldest_timestamp: Option<i64>,
}

impl MessagePage {
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            has_more: false,
            oldest_timestamp: None,
        }
    }
}

/// A persisted room record, owned by the room store collaborator.
///
/// The participant set here is canonical for listing; the per-user
/// membership mapping is canonical for "what room is this socket in".
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub creator: UserId,
    pub has_password: bool,
    pub created_at: Timestamp,
    pub participants: BTreeSet<UserId>,
}

/// Lightweight user projection for wire payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProjection {
    pub id: String,
    pub name: String,
    pub email: String,
    pub profile_image: Option<String>,
}

impl UserProjection {
    /// Placeholder used when sender resolution fails; enrichment must
    /// not fail a page load because a user record is gone.
    pub fn unknown(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: "Unknown User".to_string(),
            email: String::new(),
            profile_image: None,
        }
    }

    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
            name: "System".to_string(),
            email: String::new(),
            profile_image: None,
        }
    }

    pub fn ai(kind: &AiKind) -> Self {
        Self {
            id: kind.as_str().to_string(),
            name: kind.as_str().to_string(),
            email: String::new(),
            profile_image: None,
        }
    }
}

/// Lightweight file projection for wire payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileProjection {
    pub filename: String,
    pub original_name: String,
    pub mimetype: String,
    pub size: u64,
}

/// Why a connection went away; selects the teardown behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client closed the socket cleanly; membership torn down, no
    /// "disconnected" notice.
    Client,
    /// Transport dropped; membership torn down with a "disconnected"
    /// system message.
    Transport,
    /// Forced out by a duplicate login; the newer connection owns the
    /// registry entry, so teardown must not emit a leave notice.
    Takeover,
}
