//! UseCase layer: one module per operation, wired through the domain
//! traits and shared helpers (notifier, projector).

pub mod ai_reply;
pub mod connect_participant;
pub mod disconnect_participant;
pub mod error;
pub mod join_room;
pub mod leave_room;
pub mod load_history;
pub mod notifier;
pub mod projector;
pub mod react_message;
pub mod send_message;

#[cfg(test)]
pub(crate) mod test_support;

pub use ai_reply::AiReplyUseCase;
pub use connect_participant::{ConnectParticipantUseCase, ConnectionDetails};
pub use disconnect_participant::DisconnectParticipantUseCase;
pub use error::{
    AiReplyError, ConnectError, HistoryError, JoinRoomError, LeaveRoomError, ReactionError,
    SendMessageError,
};
pub use join_room::{JoinOutcome, JoinRoomUseCase};
pub use leave_room::{LeaveNotice, LeaveRoomUseCase};
pub use load_history::{HistoryLoader, HistoryPage};
pub use notifier::RoomNotifier;
pub use projector::MessageProjector;
pub use react_message::ReactMessageUseCase;
pub use send_message::SendMessageUseCase;
