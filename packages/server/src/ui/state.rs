//! Server state and connection management.

use std::sync::Arc;

use crate::domain::MembershipRepository;
use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, HistoryLoader, JoinRoomUseCase,
    LeaveRoomUseCase, ReactMessageUseCase, SendMessageUseCase,
};

/// Shared application state
pub struct AppState {
    pub connect_usecase: Arc<ConnectParticipantUseCase>,
    pub disconnect_usecase: Arc<DisconnectParticipantUseCase>,
    pub join_usecase: Arc<JoinRoomUseCase>,
    pub leave_usecase: Arc<LeaveRoomUseCase>,
    pub send_usecase: Arc<SendMessageUseCase>,
    pub react_usecase: Arc<ReactMessageUseCase>,
    pub history: Arc<HistoryLoader>,
    /// Needed by the fetch handler to resolve the requester's room.
    pub membership: Arc<dyn MembershipRepository>,
    pub page_size: usize,
}
