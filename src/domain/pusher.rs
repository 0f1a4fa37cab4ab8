//! MessagePusher trait 定義
//!
//! セッションへのメッセージ送信（push）のインターフェース。
//! 具体的な実装（WebSocket）は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::PushError;
use super::value_object::SessionId;

/// セッションごとの送信チャンネル
///
/// WebSocket の送信タスクが受信側を保持し、ここへ送った文字列が
/// そのままクライアントへ届きます。unbounded のため push 側は
/// 遅いピアでブロックしません。
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// メッセージ送信の抽象化
///
/// 登録済みチャンネルの集合が「生きているセッション」の集合そのものです。
/// `broadcast_all` はこの集合全体への配信に使われます。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// セッションの送信チャンネルを登録
    async fn register_session(&self, session_id: SessionId, sender: PusherChannel);

    /// セッションの送信チャンネルを登録解除
    async fn unregister_session(&self, session_id: &SessionId);

    /// 特定のセッションへ送信
    async fn push_to(&self, session_id: &SessionId, content: &str) -> Result<(), PushError>;

    /// 指定されたセッション群へ配信（一部の送信失敗は許容）
    async fn broadcast(&self, targets: Vec<SessionId>, content: &str) -> Result<(), PushError>;

    /// 登録済みの全セッションへ配信（`exclude` を除く）
    async fn broadcast_all(
        &self,
        content: &str,
        exclude: Option<SessionId>,
    ) -> Result<(), PushError>;

    /// 登録済みセッション数
    async fn session_count(&self) -> usize;
}
