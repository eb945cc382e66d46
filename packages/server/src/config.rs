//! Coordinator tunables.
//!
//! Production defaults follow the deployed system (10s duplicate-login
//! grace, 10s fetch timeout, 2s backoff base capped at 10s, 3 retries,
//! 300ms in-flight grace); tests inject millisecond values.

use std::time::Duration;

use crate::domain::AiKind;

/// History loader timeout/retry discipline.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Hard timeout for one underlying page fetch.
    pub fetch_timeout: Duration,
    /// First retry delay; doubled each attempt.
    pub retry_base: Duration,
    /// Upper bound on a retry delay.
    pub retry_cap: Duration,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// How long the per-(room,user) in-flight marker outlives a
    /// completed request, to absorb bursty duplicate fetches.
    pub inflight_grace: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            retry_base: Duration::from_secs(2),
            retry_cap: Duration::from_secs(10),
            max_retries: 3,
            inflight_grace: Duration::from_millis(300),
        }
    }
}

/// Top-level coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// History page size for joins and backward paging.
    pub page_size: usize,
    /// Window during which a connection replaced by a duplicate login
    /// may still emit/receive before it is force-disconnected.
    pub duplicate_login_grace: Duration,
    /// Recognized AI identifiers; mentions outside this set are plain
    /// text.
    pub ai_kinds: Vec<AiKind>,
    pub history: HistoryConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            page_size: 30,
            duplicate_login_grace: Duration::from_secs(10),
            ai_kinds: default_ai_kinds(),
            history: HistoryConfig::default(),
        }
    }
}

fn default_ai_kinds() -> Vec<AiKind> {
    ["wayneAI", "consultingAI"]
        .into_iter()
        .filter_map(|name| AiKind::new(name.to_string()).ok())
        .collect()
}
