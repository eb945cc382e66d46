//! Redis 実装の Repository 群
//!
//! プレゼンスとメンバーシップだけを Redis に置く。どちらも複数
//! インスタンス間で共有しないと意味がない状態で、メッセージ本体は
//! 別系統のストアが持つ。

mod membership;
mod presence;

pub use membership::RedisMembershipRepository;
pub use presence::RedisPresenceRepository;

use crate::domain::RepositoryError;

fn store_err(e: redis::RedisError) -> RepositoryError {
    RepositoryError::Store(e.to_string())
}
