//! AI text-generation collaborator.
//!
//! The source system drives generation through start/complete/error
//! callbacks; here the lifecycle is folded into a single async call
//! returning result-or-error. The orchestrator emits its "started"
//! event before awaiting, so no re-entrant callback chain exists.

use async_trait::async_trait;
use thiserror::Error;

use super::model::AiKind;

/// A finished generation: the final text plus token accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiCompletion {
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AiError {
    /// The generation backend rejected or failed the request.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The backend is unreachable.
    #[error("generation backend unavailable: {0}")]
    Unavailable(String),
}

/// Text-generation capability; calls complete or fail exactly once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiGenerator: Send + Sync {
    async fn generate(&self, query: &str, kind: &AiKind) -> Result<AiCompletion, AiError>;
}
