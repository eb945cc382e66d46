//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` の管理
//! - doomed マーク（重複ログイン乗っ取りの第一段階）の管理
//! - イベントのシリアライズ前の送出（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行います。
//! この実装は生成された `UnboundedSender` を受け取り、イベント送出に
//! 使用します。`kill` は sender を落とすだけで、ソケットのクローズは
//! sender の消失を検知したポンプタスク側で行われます。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ConnectionId, MessagePushError, MessagePusher, PusherChannel, ServerEvent,
};

/// WebSocket を使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    /// 接続中の接続 ID と対応する sender のマップ
    clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
    /// 強制切断待ちの接続
    doomed: Arc<Mutex<HashSet<ConnectionId>>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
            doomed: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_connection(&self, conn: ConnectionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(conn, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", conn);
    }

    async fn unregister_connection(&self, conn: ConnectionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(&conn);
        // 切断処理は unregister の前に is_doomed を読むので、マークは
        // ここで一緒に回収してよい（残すとプロセス寿命ぶん溜まる）
        self.doomed.lock().await.remove(&conn);
        tracing::debug!("Connection '{}' unregistered from MessagePusher", conn);
    }

    async fn is_attached(&self, conn: ConnectionId) -> bool {
        self.clients.lock().await.contains_key(&conn)
    }

    async fn mark_doomed(&self, conn: ConnectionId) {
        let mut doomed = self.doomed.lock().await;
        doomed.insert(conn);
        tracing::debug!("Connection '{}' marked doomed", conn);
    }

    async fn is_doomed(&self, conn: ConnectionId) -> bool {
        self.doomed.lock().await.contains(&conn)
    }

    async fn kill(&self, conn: ConnectionId) {
        let mut clients = self.clients.lock().await;
        // sender を落とすとポンプタスクの recv が終わり、ソケットが
        // クローズされる
        clients.remove(&conn);
        tracing::info!("Connection '{}' killed", conn);
    }

    async fn push_to(
        &self,
        conn: ConnectionId,
        event: ServerEvent,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        if let Some(sender) = clients.get(&conn) {
            sender
                .send(event)
                .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
            tracing::debug!("Pushed event to connection '{}'", conn);
            Ok(())
        } else {
            Err(MessagePushError::ConnectionNotFound(conn.to_string()))
        }
    }

    async fn broadcast(&self, targets: Vec<ConnectionId>, event: ServerEvent) {
        let clients = self.clients.lock().await;

        for target in targets {
            if let Some(sender) = clients.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                if let Err(e) = sender.send(event.clone()) {
                    tracing::warn!("Failed to push event to connection '{}': {}", target, e);
                }
            } else {
                tracing::debug!("Connection '{}' not found during broadcast, skipping", target);
            }
        }
    }
}
