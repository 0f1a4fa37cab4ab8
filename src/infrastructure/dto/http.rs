//! HTTP API の DTO

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::StoredLocation;

/// `GET /api/health` のレスポンス
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub connected_sessions: usize,
    pub database: String,
}

/// `GET /api/locations/{user_id}` の 1 レコード
///
/// WebSocket のファンアウトと同じ形式（type タグを除く）。
/// どちらのバックエンドから読まれたかはレスポンスに現れません。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecordDto {
    pub id: i64,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

impl From<&StoredLocation> for LocationRecordDto {
    fn from(stored: &StoredLocation) -> Self {
        Self {
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
