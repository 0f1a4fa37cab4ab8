//! WebSocket メッセージの DTO
//!
//! インバウンドは `type` フィールドでディスパッチされるため、ここでは
//! ペイロード部分だけを型として定義します（未知のフィールドは無視）。
//! アウトバウンドは `type` タグを含む完全なメッセージ型です。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::StoredLocation;

// ========================================
// Inbound payloads
// ========================================

/// `connect-identify` / `subscribe-user` / `unsubscribe-user` のペイロード
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub user_id: String,
}

/// `location-update` のペイロード
///
/// timestamp は省略可能（省略時は受信時刻で補完される）。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdatePayload {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
}

/// `join-room` / `leave-room` のペイロード
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub room_id: String,
}

// ========================================
// Outbound messages
// ========================================

/// アウトバウンドメッセージの種別タグ
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    UserOnline,
    UserOffline,
    LocationUpdated,
    Error,
}

/// `user-online {userId}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOnlineMessage {
    pub r#type: EventType,
    pub user_id: String,
}

impl UserOnlineMessage {
    pub fn new(user_id: String) -> Self {
        Self {
            r#type: EventType::UserOnline,
            user_id,
        }
    }
}

/// `user-offline {userId}`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOfflineMessage {
    pub r#type: EventType,
    pub user_id: String,
}

impl UserOfflineMessage {
    pub fn new(user_id: String) -> Self {
        Self {
            r#type: EventType::UserOffline,
            user_id,
        }
    }
}

/// `location-updated {...}` — 永続化済みレコードのファンアウト形式
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdatedMessage {
    pub r#type: EventType,
    pub id: i64,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

impl From<&StoredLocation> for LocationUpdatedMessage {
    fn from(stored: &StoredLocation) -> Self {
        Self {
            r#type: EventType::LocationUpdated,
            id: stored.id,
            user_id: stored.event.user_id.as_str().to_string(),
            latitude: stored.event.latitude,
            longitude: stored.event.longitude,
            timestamp: stored.event.timestamp,
            accuracy: stored.event.accuracy,
            speed: stored.event.speed,
            heading: stored.event.heading,
        }
    }
}

/// `error {message}` — 送信元セッションのみに返されるエラー応答
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub r#type: EventType,
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: String) -> Self {
        Self {
            r#type: EventType::Error,
            message,
        }
    }
}
