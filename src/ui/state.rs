//! Server state and connection management.

use std::sync::Arc;

use crate::domain::MessagePusher;
use crate::usecase::{EventDispatcher, PersistenceGateway, SessionRegistry};

/// Shared application state
pub struct AppState {
    /// EventDispatcher（インバウンドイベント処理の統括）
    pub dispatcher: Arc<EventDispatcher>,
    /// SessionRegistry（接続とユーザー識別の対応）
    pub registry: Arc<SessionRegistry>,
    /// PersistenceGateway（位置情報の読み戻し用）
    pub gateway: Arc<PersistenceGateway>,
    /// MessagePusher（メッセージ通知の抽象化）
    pub message_pusher: Arc<dyn MessagePusher>,
}
