//! インメモリ実装の Repository 群
//!
//! 開発・テスト用。単一プロセス内の `Mutex` 保護されたマップで
//! 永続化せずに全トレイトを満たす。

mod directory;
mod file;
mod membership;
mod message;
mod presence;
mod room;

pub use directory::InMemoryUserDirectory;
pub use file::InMemoryFileStore;
pub use membership::InMemoryMembershipRepository;
pub use message::InMemoryMessageRepository;
pub use presence::InMemoryPresenceRepository;
pub use room::InMemoryRoomStore;
