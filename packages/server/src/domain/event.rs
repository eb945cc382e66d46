//! Wire-level payloads exchanged with connections.
//!
//! `ServerEvent` covers every event the coordinator pushes to a socket;
//! `ClientCommand` covers every frame a client may send. Both are
//! `type`-tagged JSON, field names camelCased on the wire.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{FileProjection, MessageKind, UserProjection};

/// An enriched message as delivered to clients: sender and file
/// references resolved to lightweight projections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub room_id: String,
    pub kind: MessageKind,
    pub sender: UserProjection,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileProjection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_kind: Option<String>,
    pub timestamp: i64,
    pub readers: Vec<String>,
    pub reactions: BTreeMap<String, BTreeSet<String>>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Events pushed from the coordinator to a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    JoinRoomSuccess {
        room_id: String,
        participants: Vec<UserProjection>,
        messages: Vec<MessageView>,
        has_more: bool,
        oldest_timestamp: Option<i64>,
    },
    JoinRoomError {
        message: String,
    },
    Message(MessageView),
    ParticipantsUpdate {
        participants: Vec<UserProjection>,
    },
    MessageLoadStart,
    PreviousMessagesLoaded {
        messages: Vec<MessageView>,
        has_more: bool,
        oldest_timestamp: Option<i64>,
    },
    Error {
        error_type: String,
        message: String,
    },
    #[serde(rename = "duplicate_login")]
    DuplicateLogin {
        device_info: String,
        ip_address: String,
        timestamp: i64,
    },
    #[serde(rename = "session_ended")]
    SessionEnded {
        reason: String,
        message: String,
    },
    AiMessageStart {
        session_id: String,
        ai_kind: String,
        timestamp: i64,
    },
    AiMessageComplete {
        session_id: String,
        message_id: String,
        content: String,
        timestamp: i64,
    },
    AiMessageError {
        session_id: String,
        error: String,
    },
    MessageReactionUpdate {
        message_id: String,
        reactions: BTreeMap<String, BTreeSet<String>>,
    },
    MessagesRead {
        user_id: String,
        message_ids: Vec<String>,
    },
}

/// Direction of a reaction mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionAction {
    Add,
    Remove,
}

/// Frames a client may send over the socket.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    JoinRoom {
        room_id: String,
    },
    LeaveRoom,
    ChatMessage {
        kind: MessageKind,
        #[serde(default)]
        content: String,
        #[serde(default)]
        file_id: Option<String>,
    },
    FetchPreviousMessages {
        #[serde(default)]
        before: Option<i64>,
    },
    MessageReaction {
        message_id: String,
        reaction: String,
        action: ReactionAction,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_carries_type_tag() {
        // テスト項目: ServerEvent は "type" タグ付き JSON になる
        // given (前提条件):
        let event = ServerEvent::SessionEnded {
            reason: "duplicate_login".to_string(),
            message: "signed in from another device".to_string(),
        };

        // when (操作):
        let json = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "session_ended");
        assert_eq!(json["reason"], "duplicate_login");
    }

    #[test]
    fn test_participants_update_uses_camel_case_fields() {
        // テスト項目: フィールド名はワイヤ上で camelCase になる
        // given (前提条件):
        let event = ServerEvent::PreviousMessagesLoaded {
            messages: vec![],
            has_more: false,
            oldest_timestamp: None,
        };

        // when (操作):
        let json = serde_json::to_value(&event).unwrap();

        // then (期待する結果):
        assert_eq!(json["type"], "previousMessagesLoaded");
        assert_eq!(json["hasMore"], false);
        assert!(json.get("has_more").is_none());
    }

    #[test]
    fn test_client_command_parses_chat_message() {
        // テスト項目: chatMessage フレームがパースできる
        // given (前提条件):
        let raw = r#"{"type":"chatMessage","kind":"text","content":"hello"}"#;

        // when (操作):
        let cmd: ClientCommand = serde_json::from_str(raw).unwrap();

        // then (期待する結果):
        assert_eq!(
            cmd,
            ClientCommand::ChatMessage {
                kind: MessageKind::Text,
                content: "hello".to_string(),
                file_id: None,
            }
        );
    }

    #[test]
    fn test_client_command_parses_reaction() {
        // テスト項目: messageReaction フレームがパースできる
        let raw = r#"{"type":"messageReaction","messageId":"m1","reaction":"👍","action":"add"}"#;
        let cmd: ClientCommand = serde_json::from_str(raw).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::MessageReaction {
                message_id: "m1".to_string(),
                reaction: "👍".to_string(),
                action: ReactionAction::Add,
            }
        );
    }
}
