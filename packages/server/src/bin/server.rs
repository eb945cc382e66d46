//! Chat session coordinator server.
//!
//! Presence arbitration, room membership, paginated history, and
//! streaming AI replies over a WebSocket endpoint.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin chanoma-server
//! cargo run --bin chanoma-server -- --host 0.0.0.0 --port 3000
//! cargo run --bin chanoma-server -- --redis-url redis://127.0.0.1/
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use chanoma_server::{
    config::CoordinatorConfig,
    domain::{MembershipRepository, PresenceRepository, Room, RoomId, Timestamp, UserId, UserProjection},
    infrastructure::{
        ai::EchoAiGenerator,
        message_pusher::WebSocketMessagePusher,
        repository::inmemory::{
            InMemoryFileStore, InMemoryMembershipRepository, InMemoryMessageRepository,
            InMemoryPresenceRepository, InMemoryRoomStore, InMemoryUserDirectory,
        },
        repository::redis::{RedisMembershipRepository, RedisPresenceRepository},
    },
    ui::{Server, state::AppState},
    usecase::{
        AiReplyUseCase, ConnectParticipantUseCase, DisconnectParticipantUseCase, HistoryLoader,
        JoinRoomUseCase, LeaveRoomUseCase, MessageProjector, ReactMessageUseCase, RoomNotifier,
        SendMessageUseCase,
    },
};
use chanoma_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "chanoma-server")]
#[command(about = "Real-time chat session coordinator", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Redis connection URL for presence/membership; in-memory when omitted
    #[arg(long)]
    redis_url: Option<String>,

    /// History page size for joins and backward paging
    #[arg(long, default_value = "30")]
    page_size: usize,

    /// Seconds an overtaken connection is kept alive before forced
    /// disconnect
    #[arg(long, default_value = "10")]
    duplicate_login_grace: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let config = CoordinatorConfig {
        page_size: args.page_size,
        duplicate_login_grace: Duration::from_secs(args.duplicate_login_grace),
        ..CoordinatorConfig::default()
    };

    // Initialize dependencies in order:
    // 1. Repositories (presence/membership optionally on Redis)
    // 2. MessagePusher
    // 3. Shared helpers (notifier, projector)
    // 4. UseCases
    // 5. AppState and Server

    let (presence, membership): (Arc<dyn PresenceRepository>, Arc<dyn MembershipRepository>) =
        match &args.redis_url {
            Some(url) => {
                let manager = match connect_redis(url).await {
                    Ok(manager) => manager,
                    Err(e) => {
                        tracing::error!("Failed to connect to Redis at '{}': {}", url, e);
                        std::process::exit(1);
                    }
                };
                tracing::info!("Using Redis presence/membership at '{}'", url);
                (
                    Arc::new(RedisPresenceRepository::new(manager.clone())),
                    Arc::new(RedisMembershipRepository::new(manager)),
                )
            }
            None => {
                tracing::info!("Using in-memory presence/membership");
                (
                    Arc::new(InMemoryPresenceRepository::new()),
                    Arc::new(InMemoryMembershipRepository::new()),
                )
            }
        };

    let room_store = Arc::new(InMemoryRoomStore::new());
    let messages = Arc::new(InMemoryMessageRepository::new());
    let directory = Arc::new(InMemoryUserDirectory::new());
    let file_store = Arc::new(InMemoryFileStore::new());
    seed_demo_data(&room_store, &directory).await;

    let pusher = Arc::new(WebSocketMessagePusher::new());
    let clock = Arc::new(SystemClock);

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

    let history = Arc::new(HistoryLoader::new(
        messages.clone(),
        projector.clone(),
        notifier.clone(),
        config.history.clone(),
    ));
    let leave_usecase = Arc::new(LeaveRoomUseCase::new(
        membership.clone(),
        room_store.clone(),
        messages.clone(),
        directory.clone(),
        notifier.clone(),
        projector.clone(),
        clock.clone(),
    ));
    let join_usecase = Arc::new(JoinRoomUseCase::new(
        membership.clone(),
        room_store.clone(),
        messages.clone(),
        directory.clone(),
        history.clone(),
        leave_usecase.clone(),
        notifier.clone(),
        projector.clone(),
        clock.clone(),
        config.page_size,
    ));
    let connect_usecase = Arc::new(ConnectParticipantUseCase::new(
        presence.clone(),
        directory.clone(),
        pusher.clone(),
        clock.clone(),
        config.duplicate_login_grace,
    ));
    let disconnect_usecase = Arc::new(DisconnectParticipantUseCase::new(
        presence.clone(),
        pusher.clone(),
        leave_usecase.clone(),
    ));
    let ai = Arc::new(AiReplyUseCase::new(
        messages.clone(),
        notifier.clone(),
        Arc::new(EchoAiGenerator::new()),
        clock.clone(),
    ));
    let send_usecase = Arc::new(SendMessageUseCase::new(
        membership.clone(),
        messages.clone(),
        file_store.clone(),
        notifier.clone(),
        projector.clone(),
        ai.clone(),
        clock.clone(),
        config.ai_kinds.clone(),
    ));
    let react_usecase = Arc::new(ReactMessageUseCase::new(
        messages.clone(),
        notifier.clone(),
    ));

    let state = Arc::new(AppState {
        connect_usecase,
        disconnect_usecase,
        join_usecase,
        leave_usecase,
        send_usecase,
        react_usecase,
        history,
        membership,
        page_size: config.page_size,
    });

    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn connect_redis(url: &str) -> Result<redis::aio::ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(url)?;
    client.get_connection_manager().await
}

/// Seed a couple of rooms and users so the server is usable right
/// after startup.
async fn seed_demo_data(room_store: &InMemoryRoomStore, directory: &InMemoryUserDirectory) {
    let system = match UserId::new("system".to_string()) {
        Ok(user) => user,
        Err(_) => return,
    };

    for name in ["general", "random"] {
        if let Ok(id) = RoomId::new(name.to_string()) {
            room_store
                .insert_room(Room {
                    id,
                    name: name.to_string(),
                    creator: system.clone(),
                    has_password: false,
                    created_at: Timestamp::new(chanoma_shared::time::now_timestamp_millis()),
                    participants: Default::default(),
                })
                .await;
            tracing::info!("Room '{}' created", name);
        }
    }

    for (id, name) in [("alice", "Alice"), ("bob", "Bob")] {
        directory
            .insert_user(UserProjection {
                id: id.to_string(),
                name: name.to_string(),
                email: format!("{id}@example.com"),
                profile_image: None,
            })
            .await;
    }
}
