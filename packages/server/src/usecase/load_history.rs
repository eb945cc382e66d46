//! UseCase: 履歴ページの読み込み
//!
//! 同一 (room, user) の読み込みが進行中の間、後続の要求はキューせずに
//! 落とす（クライアントのスクロール連打対策）。1回の取得にはタイム
//! アウトがあり、失敗は指数バックオフ付きで再試行する。試行回数は
//! (room, user) ごとに追跡し、成功または予算切れでリセットする。
//! 完了後も進行中マーカーを短時間保持して、応答直後の連打を吸収する。

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::config::HistoryConfig;
use crate::domain::{
    MessagePage, MessageRepository, MessageView, RoomId, Sender, ServerEvent, UserId,
};

use super::error::HistoryError;
use super::notifier::RoomNotifier;
use super::projector::MessageProjector;

/// One enriched page of room history, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub messages: Vec<MessageView>,
    pub has_more: bool,
    pub oldest_timestamp: Option<i64>,
}

impl HistoryPage {
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            has_more: false,
            oldest_timestamp: None,
        }
    }
}

type LoadKey = (RoomId, UserId);

/// 履歴読み込みのユースケース
pub struct HistoryLoader {
    messages: Arc<dyn MessageRepository>,
    projector: Arc<MessageProjector>,
    notifier: Arc<RoomNotifier>,
    config: HistoryConfig,
    in_flight: Mutex<HashSet<LoadKey>>,
    retries: Mutex<HashMap<LoadKey, u32>>,
}

impl HistoryLoader {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        projector: Arc<MessageProjector>,
        notifier: Arc<RoomNotifier>,
        config: HistoryConfig,
    ) -> Self {
        Self {
            messages,
            projector,
            notifier,
            config,
            in_flight: Mutex::new(HashSet::new()),
            retries: Mutex::new(HashMap::new()),
        }
    }

    /// Load one page of history ending before `before` (exclusive),
    /// or the newest page when `before` is `None`.
    pub async fn load_page(
        self: &Arc<Self>,
        room: &RoomId,
        user: &UserId,
        before: Option<i64>,
        limit: usize,
    ) -> Result<HistoryPage, HistoryError> {
        let key = (room.clone(), user.clone());
        {
            let mut in_flight = match self.in_flight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !in_flight.insert(key.clone()) {
                tracing::debug!(
                    "History load for '{}' in '{}' already in flight, dropping request",
                    user,
                    room
                );
                return Err(HistoryError::LoadInProgress);
            }
        }

        let result = self.fetch_with_retry(&key, before, limit).await;
        self.schedule_marker_release(key.clone());

        let page = match result {
            Ok(page) => page,
            Err(e) => return Err(e),
        };

        let views = self.projector.project_all(&page.messages).await;
        self.mark_read_in_background(room, user, &page);

        Ok(HistoryPage {
            messages: views,
            has_more: page.has_more,
            oldest_timestamp: page.oldest_timestamp,
        })
    }

    /// Outstanding retry counters, for diagnostics.
    pub fn pending_retries(&self) -> usize {
        match self.retries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    async fn fetch_with_retry(
        &self,
        key: &LoadKey,
        before: Option<i64>,
        limit: usize,
    ) -> Result<MessagePage, HistoryError> {
        let (room, user) = key;
        let max_attempts = self.config.max_retries + 1;
        let mut timed_out = false;
        let mut last_store_error = String::new();

        for attempt in 1..=max_attempts {
            match tokio::time::timeout(
                self.config.fetch_timeout,
                self.messages.page_before(room, before, limit),
            )
            .await
            {
                Ok(Ok(page)) => {
                    self.reset_retries(key);
                    return Ok(page);
                }
                Ok(Err(e)) => {
                    timed_out = false;
                    last_store_error = e.to_string();
                    tracing::warn!(
                        "History fetch for '{}' in '{}' failed (attempt {}/{}): {}",
                        user,
                        room,
                        attempt,
                        max_attempts,
                        e
                    );
                }
                Err(_) => {
                    timed_out = true;
                    tracing::warn!(
                        "History fetch for '{}' in '{}' timed out (attempt {}/{})",
                        user,
                        room,
                        attempt,
                        max_attempts
                    );
                }
            }

            self.record_retry(key, attempt);
            if attempt < max_attempts {
                let backoff = self
                    .config
                    .retry_base
                    .saturating_mul(2u32.saturating_pow(attempt - 1))
                    .min(self.config.retry_cap);
                tokio::time::sleep(backoff).await;
            }
        }

        // Budget spent; the counter starts over on the next request.
        self.reset_retries(key);
        if timed_out {
            Err(HistoryError::Timeout {
                attempts: max_attempts,
            })
        } else {
            Err(HistoryError::Store {
                attempts: max_attempts,
                message: last_store_error,
            })
        }
    }

    fn record_retry(&self, key: &LoadKey, attempt: u32) {
        let mut retries = match self.retries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        retries.insert(key.clone(), attempt);
    }

    fn reset_retries(&self, key: &LoadKey) {
        let mut retries = match self.retries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        retries.remove(key);
    }

    /// Keep the in-flight marker alive briefly after completion so a
    /// burst of scroll events right after the response is still
    /// coalesced into the page that was just delivered.
    fn schedule_marker_release(self: &Arc<Self>, key: LoadKey) {
        let loader = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(loader.config.inflight_grace).await;
            let mut in_flight = match loader.in_flight.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            in_flight.remove(&key);
        });
    }

    /// Mark the delivered page as read by the requester and tell the
    /// room. Failures only log; the page has already been delivered.
    fn mark_read_in_background(self: &Arc<Self>, room: &RoomId, user: &UserId, page: &MessagePage) {
        let unread: Vec<_> = page
            .messages
            .iter()
            .filter(|m| m.sender != Sender::User(user.clone()) && !m.readers.contains(user))
            .map(|m| m.id.clone())
            .collect();
        if unread.is_empty() {
            return;
        }

        let loader = Arc::clone(self);
        let room = room.clone();
        let user = user.clone();
        tokio::spawn(async move {
            if let Err(e) = loader.messages.mark_read(&user, &room, &unread).await {
                tracing::warn!("Failed to mark page read by '{}' in '{}': {}", user, room, e);
                return;
            }
            let marked: Vec<String> = unread
                .iter()
                .map(|id| id.as_str().to_string())
                .collect();
            loader
                .notifier
                .broadcast_to_room(
                    &room,
                    ServerEvent::MessagesRead {
                        user_id: user.as_str().to_string(),
                        message_ids: marked,
                    },
                )
                .await;
        });
    }
}
