//! 開発用の AiGenerator 実装
//!
//! 外部の生成バックエンドなしでメンション → 応答の配線を通すための
//! エコー実装。応答は短い待ち時間の後に問い合わせ文を整形して返す。

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{AiCompletion, AiError, AiGenerator, AiKind};

/// 問い合わせ文をそのまま返すジェネレータ
pub struct EchoAiGenerator {
    delay: Duration,
}

impl EchoAiGenerator {
    pub fn new() -> Self {
        Self {
            delay: Duration::from_millis(10),
        }
    }
}

impl Default for EchoAiGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AiGenerator for EchoAiGenerator {
    async fn generate(&self, query: &str, kind: &AiKind) -> Result<AiCompletion, AiError> {
        tokio::time::sleep(self.delay).await;
        let content = format!("[{kind}] You asked: {query}");
        let prompt_tokens = query.split_whitespace().count() as u32;
        let completion_tokens = content.split_whitespace().count() as u32;
        Ok(AiCompletion {
            content,
            prompt_tokens,
            completion_tokens,
        })
    }
}
