//! テスト用の共通フィクスチャ
//!
//! インメモリのコラボレータ一式でユースケースを全部組み上げる。
//! タイムアウト・猶予はミリ秒単位に縮めてある。

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use chanoma_shared::time::Clock;

use crate::config::HistoryConfig;
use crate::domain::{
    AiKind, ConnectionId, FileId, FileProjection, MembershipRepository, MessagePusher,
    MessageRepository, PresenceRepository, Room, RoomId, RoomStore, ServerEvent, Timestamp,
    UserDirectory, UserId, UserProjection,
};
use crate::infrastructure::ai::EchoAiGenerator;
use crate::infrastructure::message_pusher::WebSocketMessagePusher;
use crate::infrastructure::repository::inmemory::{
    InMemoryFileStore, InMemoryMembershipRepository, InMemoryMessageRepository,
    InMemoryPresenceRepository, InMemoryRoomStore, InMemoryUserDirectory,
};

use super::ai_reply::AiReplyUseCase;
use super::connect_participant::{ConnectParticipantUseCase, ConnectionDetails};
use super::disconnect_participant::DisconnectParticipantUseCase;
use super::join_room::JoinRoomUseCase;
use super::leave_room::LeaveRoomUseCase;
use super::load_history::HistoryLoader;
use super::notifier::RoomNotifier;
use super::projector::MessageProjector;
use super::react_message::ReactMessageUseCase;
use super::send_message::SendMessageUseCase;

/// Monotonic test clock; every read advances by 1ms so persisted
/// timestamps are strictly ordered.
pub struct TickClock(AtomicI64);

impl TickClock {
    pub fn new() -> Self {
        Self(AtomicI64::new(1_700_000_000_000))
    }
}

impl Clock for TickClock {
    fn now_millis(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// すべてのユースケースをインメモリ実装で束ねたスタック
pub struct TestStack {
    pub presence: Arc<dyn PresenceRepository>,
    pub membership: Arc<dyn MembershipRepository>,
    pub room_store: Arc<InMemoryRoomStore>,
    pub messages: Arc<dyn MessageRepository>,
    pub directory: Arc<InMemoryUserDirectory>,
    pub file_store: Arc<InMemoryFileStore>,
    pub pusher: Arc<dyn MessagePusher>,
    pub notifier: Arc<RoomNotifier>,
    pub projector: Arc<MessageProjector>,
    pub clock: Arc<dyn Clock>,
    pub connect: Arc<ConnectParticipantUseCase>,
    pub disconnect: Arc<DisconnectParticipantUseCase>,
    pub join: Arc<JoinRoomUseCase>,
    pub leave: Arc<LeaveRoomUseCase>,
    pub send: Arc<SendMessageUseCase>,
    pub react: Arc<ReactMessageUseCase>,
    pub history: Arc<HistoryLoader>,
    pub ai: Arc<AiReplyUseCase>,
}

impl TestStack {
    pub async fn new() -> Self {
        let presence: Arc<dyn PresenceRepository> = Arc::new(InMemoryPresenceRepository::new());
        let membership: Arc<dyn MembershipRepository> =
            Arc::new(InMemoryMembershipRepository::new());
        let room_store = Arc::new(InMemoryRoomStore::new());
        let messages: Arc<dyn MessageRepository> = Arc::new(InMemoryMessageRepository::new());
        let directory = Arc::new(InMemoryUserDirectory::new());
        let file_store = Arc::new(InMemoryFileStore::new());
        let pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::new());
        let clock: Arc<dyn Clock> = Arc::new(TickClock::new());

        let notifier = Arc::new(RoomNotifier::new(
            membership.clone(),
            presence.clone(),
            pusher.clone(),
            directory.clone(),
        ));
        let projector = Arc::new(MessageProjector::new(
            directory.clone(),
            file_store.clone(),
        ));

        let history_config = HistoryConfig {
            fetch_timeout: Duration::from_millis(50),
            retry_base: Duration::from_millis(1),
            retry_cap: Duration::from_millis(5),
            max_retries: 3,
            inflight_grace: Duration::from_millis(1),
        };
        let history = Arc::new(HistoryLoader::new(
            messages.clone(),
            projector.clone(),
            notifier.clone(),
            history_config,
        ));

        let leave = Arc::new(LeaveRoomUseCase::new(
            membership.clone(),
            room_store.clone(),
            messages.clone(),
            directory.clone(),
            notifier.clone(),
            projector.clone(),
            clock.clone(),
        ));
        let join = Arc::new(JoinRoomUseCase::new(
            membership.clone(),
            room_store.clone(),
            messages.clone(),
            directory.clone(),
            history.clone(),
            leave.clone(),
            notifier.clone(),
            projector.clone(),
            clock.clone(),
            30,
        ));
        let connect = Arc::new(ConnectParticipantUseCase::new(
            presence.clone(),
            directory.clone(),
            pusher.clone(),
            clock.clone(),
            Duration::from_millis(10),
        ));
        let disconnect = Arc::new(DisconnectParticipantUseCase::new(
            presence.clone(),
            pusher.clone(),
            leave.clone(),
        ));
        let ai = Arc::new(AiReplyUseCase::new(
            messages.clone(),
            notifier.clone(),
            Arc::new(EchoAiGenerator::new()),
            clock.clone(),
        ));
        let ai_kinds = ["wayneAI", "consultingAI"]
            .into_iter()
            .filter_map(|name| AiKind::new(name.to_string()).ok())
            .collect();
        let send = Arc::new(SendMessageUseCase::new(
            membership.clone(),
            messages.clone(),
            file_store.clone(),
            notifier.clone(),
            projector.clone(),
            ai.clone(),
            clock.clone(),
            ai_kinds,
        ));
        let react = Arc::new(ReactMessageUseCase::new(
            messages.clone(),
            notifier.clone(),
        ));

        Self {
            presence,
            membership,
            room_store,
            messages,
            directory,
            file_store,
            pusher,
            notifier,
            projector,
            clock,
            connect,
            disconnect,
            join,
            leave,
            send,
            react,
            history,
            ai,
        }
    }

    pub fn user(&self, id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    pub fn room(&self, id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    /// Insert a room record so joins can find it.
    pub async fn seed_room(&self, room: &RoomId) {
        self.room_store
            .insert_room(Room {
                id: room.clone(),
                name: room.as_str().to_string(),
                creator: self.user("seed"),
                has_password: false,
                created_at: Timestamp::new(0),
                participants: Default::default(),
            })
            .await;
    }

    pub async fn seed_user(&self, user: &UserId, name: &str) {
        self.directory
            .insert_user(UserProjection {
                id: user.as_str().to_string(),
                name: name.to_string(),
                email: format!("{}@example.com", user),
                profile_image: None,
            })
            .await;
    }

    /// Register a file record, returning its generated id.
    pub async fn seed_file(&self, projection: FileProjection) -> FileId {
        let id = FileId::new(uuid::Uuid::new_v4().to_string()).unwrap();
        self.file_store.insert_file(id.clone(), projection).await;
        id
    }

    /// Put a user straight into a room, bypassing the join usecase
    /// (no join notice, no broadcasts).
    pub async fn put_in_room(&self, user: &UserId, room: &RoomId) {
        self.seed_room(room).await;
        self.membership.add_member(room, user).await.unwrap();
        self.membership.set_current_room(user, room).await.unwrap();
        self.room_store.add_participant(room, user).await.unwrap();
    }

    /// Open a connection through the connect usecase, seeding the
    /// directory entry if it is missing.
    pub async fn connect(&self, user: &UserId) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        if self
            .directory
            .get_user_by_id(user)
            .await
            .unwrap()
            .is_none()
        {
            self.seed_user(user, user.as_str()).await;
        }
        let conn = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        self.connect
            .execute(user, conn, tx, ConnectionDetails::default())
            .await
            .unwrap();
        (conn, rx)
    }
}

/// Collect everything currently buffered on a connection's channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
