//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - WebSocket の `UnboundedSender` を管理
//! - セッションへのメッセージ送信（push_to, broadcast, broadcast_all）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`src/ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `UnboundedSender` を受け取り、メッセージ送信に使用します。
//! 登録済み sender の集合がそのまま「生きているセッション」の集合になるため、
//! 全体ブロードキャストはこのマップのスナップショットに対して行われます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{MessagePusher, PushError, PusherChannel, SessionId};

/// WebSocket を使った MessagePusher 実装
pub struct WebSocketMessagePusher {
    /// 接続中セッションの WebSocket sender
    ///
    /// Key: SessionId
    /// Value: PusherChannel
    sessions: Mutex<HashMap<SessionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
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
    async fn register_session(&self, session_id: SessionId, sender: PusherChannel) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session_id, sender);
        tracing::debug!("Session '{}' registered to MessagePusher", session_id);
    }

    async fn unregister_session(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_id);
        tracing::debug!("Session '{}' unregistered from MessagePusher", session_id);
    }

    async fn push_to(&self, session_id: &SessionId, content: &str) -> Result<(), PushError> {
        let sessions = self.sessions.lock().await;

        if let Some(sender) = sessions.get(session_id) {
            sender
                .send(content.to_string())
                .map_err(|e| PushError::PushFailed(e.to_string()))?;
            tracing::debug!("Pushed message to session '{}'", session_id);
            Ok(())
        } else {
            Err(PushError::SessionNotFound(session_id.to_string()))
        }
    }

    async fn broadcast(&self, targets: Vec<SessionId>, content: &str) -> Result<(), PushError> {
        let sessions = self.sessions.lock().await;

        for target in targets {
            if let Some(sender) = sessions.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                if let Err(e) = sender.send(content.to_string()) {
                    tracing::warn!("Failed to push message to session '{}': {}", target, e);
                } else {
                    tracing::debug!("Broadcasted message to session '{}'", target);
                }
            } else {
                tracing::warn!("Session '{}' not found during broadcast, skipping", target);
            }
        }

        Ok(())
    }

    async fn broadcast_all(
        &self,
        content: &str,
        exclude: Option<SessionId>,
    ) -> Result<(), PushError> {
        let sessions = self.sessions.lock().await;

        for (session_id, sender) in sessions.iter() {
            if Some(*session_id) == exclude {
                continue;
            }
            if let Err(e) = sender.send(content.to_string()) {
                tracing::warn!("Failed to push message to session '{}': {}", session_id, e);
            }
        }

        Ok(())
    }

    async fn session_count(&self) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - WebSocketMessagePusher の基本的なメッセージ送信機能
    // - push_to: 特定のセッションへの送信
    // - broadcast: 複数セッションへの送信
    // - broadcast_all: 全セッションへの送信（除外指定あり）
    // - エラーハンドリング（存在しないセッション）
    //
    // 【なぜこのテストが必要か】
    // - MessagePusher は Registry / Router から呼ばれる通信層の中核
    // - プレゼンス通知・位置情報のファンアウトが正しく届くことを保証する
    // ========================================

    async fn register(pusher: &WebSocketMessagePusher) -> (SessionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = SessionId::generate();
        pusher.register_session(session_id, tx).await;
        (session_id, rx)
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 特定のセッションにメッセージを送信できる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (session_id, mut rx) = register(&pusher).await;

        // when (操作):
        let result = pusher.push_to(&session_id, "Hello").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some("Hello".to_string()));
    }

    #[tokio::test]
    async fn test_push_to_session_not_found() {
        // テスト項目: 存在しないセッションへの送信はエラーを返す
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let unknown = SessionId::generate();

        // when (操作):
        let result = pusher.push_to(&unknown, "Hello").await;

        // then (期待する結果):
        assert!(matches!(
            result.unwrap_err(),
            PushError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_broadcast_success() {
        // テスト項目: 複数のセッションにメッセージをブロードキャストできる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, mut rx1) = register(&pusher).await;
        let (bob, mut rx2) = register(&pusher).await;

        // when (操作):
        let result = pusher.broadcast(vec![alice, bob], "Broadcast message").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx1.recv().await, Some("Broadcast message".to_string()));
        assert_eq!(rx2.recv().await, Some("Broadcast message".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        // テスト項目: ブロードキャスト時、一部のセッションが存在しなくても成功する
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, mut rx1) = register(&pusher).await;
        let unknown = SessionId::generate();

        // when (操作):
        let result = pusher.broadcast(vec![alice, unknown], "Broadcast message").await;

        // then (期待する結果): 部分失敗は許容される
        assert!(result.is_ok());
        assert_eq!(rx1.recv().await, Some("Broadcast message".to_string()));
    }

    #[tokio::test]
    async fn test_broadcast_all_excludes_sender() {
        // テスト項目: broadcast_all が除外指定されたセッションに送信しない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, mut rx1) = register(&pusher).await;
        let (_bob, mut rx2) = register(&pusher).await;

        // when (操作):
        let result = pusher.broadcast_all("presence", Some(alice)).await;

        // then (期待する結果): alice には届かず bob には届く
        assert!(result.is_ok());
        assert_eq!(rx2.recv().await, Some("presence".to_string()));
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_empty_targets() {
        // テスト項目: 空のターゲットリストでもエラーにならない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();

        // when (操作):
        let result = pusher.broadcast(vec![], "Message").await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_session_count_tracks_registrations() {
        // テスト項目: 登録・登録解除がセッション数に反映される
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, _rx1) = register(&pusher).await;
        let (_bob, _rx2) = register(&pusher).await;
        assert_eq!(pusher.session_count().await, 2);

        // when (操作):
        pusher.unregister_session(&alice).await;

        // then (期待する結果):
        assert_eq!(pusher.session_count().await, 1);
    }
}
