//! EventDispatcher — インバウンドイベントの統括
//!
//! セッションから届いた 1 メッセージを 1 タスクとして処理します。
//! 同一セッションのメッセージは受信ループが逐次 await するため
//! 到着順に処理され、異なるセッション間の順序は保証しません。
//!
//! エラー方針:
//! - ペイロードの検証エラー → 送信元セッションだけに `error` を返す
//!   （接続は維持）
//! - 未知のイベント種別 → ログのみ（無視）
//! - ストレージ障害 → Gateway 内でキャッシュにフォールバック済みのため
//!   ここには現れない
//! どのエラーも接続を切断しません。

use std::sync::Arc;

use serde_json::Value;

use crate::common::time::Clock;
use crate::domain::{LocationEvent, MessagePusher, RoomKey, SessionId, UserId};
use crate::infrastructure::dto::websocket::{
    ErrorMessage, LocationUpdatePayload, LocationUpdatedMessage, RoomPayload, UserPayload,
};

use super::gateway::PersistenceGateway;
use super::registry::SessionRegistry;
use super::router::RoomRouter;

/// インバウンドイベントのディスパッチャ
pub struct EventDispatcher {
    registry: Arc<SessionRegistry>,
    router: Arc<RoomRouter>,
    gateway: Arc<PersistenceGateway>,
    pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    /// 位置更新をルーム宛に加えて全セッションへも配信するか
    ///
    /// 元の配信モデル（targeted + global）。グローバル側は接続中の全
    /// クライアントに全ユーザーの位置が見えるため、設定で切れるように
    /// してあります。
    broadcast_global: bool,
}

impl EventDispatcher {
    pub fn new(
        registry: Arc<SessionRegistry>,
        router: Arc<RoomRouter>,
        gateway: Arc<PersistenceGateway>,
        pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        broadcast_global: bool,
    ) -> Self {
        Self {
            registry,
            router,
            gateway,
            pusher,
            clock,
            broadcast_global,
        }
    }

    /// 接続受付（Session Registry へ委譲）
    pub async fn on_connect(&self, session_id: SessionId) {
        self.registry.register(session_id).await;
    }

    /// 切断（Session Registry へ委譲; プレゼンス通知は Registry が行う）
    pub async fn on_disconnect(&self, session_id: SessionId) {
        self.registry.deregister(session_id).await;
    }

    /// 受信テキストを 1 件処理する
    ///
    /// `type` フィールドでディスパッチします。未知の種別・JSON でない
    /// テキストはログの上で無視します（プロトコルエラーは致命的でない）。
    pub async fn handle_message(&self, session_id: SessionId, text: &str) {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Session '{}' sent non-JSON message: {}", session_id, e);
                return;
            }
        };

        let Some(event_type) = value.get("type").and_then(Value::as_str).map(str::to_string)
        else {
            tracing::warn!("Session '{}' sent message without type field", session_id);
            return;
        };

        match event_type.as_str() {
            "connect-identify" => self.on_identify(session_id, value).await,
            "location-update" => self.on_location_update(session_id, value).await,
            "subscribe-user" => self.on_subscribe_user(session_id, value).await,
            "unsubscribe-user" => self.on_unsubscribe_user(session_id, value).await,
            "join-room" => self.on_join_room(session_id, value).await,
            "leave-room" => self.on_leave_room(session_id, value).await,
            unknown => {
                tracing::warn!(
                    "Session '{}' sent unknown event type '{}', ignoring",
                    session_id,
                    unknown
                );
            }
        }
    }

    /// `connect-identify`: セッションへのユーザー識別バインド
    async fn on_identify(&self, session_id: SessionId, payload: Value) {
        let Some(user_id) = self.parse_user_id(session_id, payload).await else {
            return;
        };
        self.registry.bind_user(session_id, user_id).await;
    }

    /// `location-update`: 検証 → 永続化 → ファンアウト
    async fn on_location_update(&self, session_id: SessionId, payload: Value) {
        let payload: LocationUpdatePayload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.error_ack(session_id, format!("invalid location-update payload: {e}"))
                    .await;
                return;
            }
        };
        let user_id = match UserId::new(payload.user_id) {
            Ok(user_id) => user_id,
            Err(e) => {
                self.error_ack(session_id, format!("invalid location-update payload: {e}"))
                    .await;
                return;
            }
        };

        // timestamp 省略時は受信時刻で補完
        let timestamp = payload.timestamp.unwrap_or_else(|| self.clock.now_utc());
        let event = LocationEvent::new(user_id.clone(), payload.latitude, payload.longitude, timestamp)
            .with_motion(payload.accuracy, payload.speed, payload.heading);

        // 永続化（障害時は Gateway 内でキャッシュへフォールバック）
        let stored = match self.gateway.record_location(&event).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Failed to record location for '{}': {}", user_id, e);
                self.error_ack(session_id, "failed to process location".to_string())
                    .await;
                return;
            }
        };

        tracing::info!(
            "Location updated for user '{}': {}, {}",
            user_id,
            stored.event.latitude,
            stored.event.longitude
        );

        let message = LocationUpdatedMessage::from(&stored);
        let json = serde_json::to_string(&message).unwrap();

        // ユーザー個人ルームへのターゲット配信（ルーム内にいる送信者にも届く）
        let room = RoomKey::user(user_id);
        if let Err(e) = self.router.fan_out(&room, &json, None).await {
            tracing::warn!("Failed to fan out location update to '{}': {}", room, e);
        }

        // 全セッションへのブロードキャスト（送信者を除く）
        if self.broadcast_global {
            if let Err(e) = self.router.broadcast_all(&json, Some(session_id)).await {
                tracing::warn!("Failed to broadcast location update: {}", e);
            }
        }
    }

    /// `subscribe-user`: 対象ユーザーのルームへ参加
    async fn on_subscribe_user(&self, session_id: SessionId, payload: Value) {
        let Some(user_id) = self.parse_user_id(session_id, payload).await else {
            return;
        };
        self.router
            .subscribe(session_id, RoomKey::user(user_id))
            .await;
    }

    /// `unsubscribe-user`: 対象ユーザーのルームから離脱
    async fn on_unsubscribe_user(&self, session_id: SessionId, payload: Value) {
        let Some(user_id) = self.parse_user_id(session_id, payload).await else {
            return;
        };
        self.router
            .unsubscribe(&session_id, &RoomKey::user(user_id))
            .await;
    }

    /// `join-room`: グループルームへ参加
    async fn on_join_room(&self, session_id: SessionId, payload: Value) {
        let Some(room_key) = self.parse_room_key(session_id, payload).await else {
            return;
        };
        self.router.subscribe(session_id, room_key).await;
    }

    /// `leave-room`: グループルームから離脱
    async fn on_leave_room(&self, session_id: SessionId, payload: Value) {
        let Some(room_key) = self.parse_room_key(session_id, payload).await else {
            return;
        };
        self.router.unsubscribe(&session_id, &room_key).await;
    }

    async fn parse_user_id(&self, session_id: SessionId, payload: Value) -> Option<UserId> {
        let payload: UserPayload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.error_ack(session_id, format!("invalid payload: {e}")).await;
                return None;
            }
        };
        match UserId::new(payload.user_id) {
            Ok(user_id) => Some(user_id),
            Err(e) => {
                self.error_ack(session_id, format!("invalid payload: {e}")).await;
                None
            }
        }
    }

    async fn parse_room_key(&self, session_id: SessionId, payload: Value) -> Option<RoomKey> {
        let payload: RoomPayload = match serde_json::from_value(payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.error_ack(session_id, format!("invalid payload: {e}")).await;
                return None;
            }
        };
        match RoomKey::group(payload.room_id) {
            Ok(room_key) => Some(room_key),
            Err(e) => {
                self.error_ack(session_id, format!("invalid payload: {e}")).await;
                None
            }
        }
    }

    /// 送信元セッションだけに `error` を返す（接続は維持）
    async fn error_ack(&self, session_id: SessionId, message: String) {
        tracing::warn!("Session '{}': {}", session_id, message);
        let error = ErrorMessage::new(message);
        let json = serde_json::to_string(&error).unwrap();
        if let Err(e) = self.pusher.push_to(&session_id, &json).await {
            tracing::warn!("Failed to send error ack to '{}': {}", session_id, e);
        }
    }
}
