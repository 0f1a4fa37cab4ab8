//! エンティティ定義

use chrono::{DateTime, Utc};

use super::value_object::UserId;

/// 1 件の位置情報イベント
///
/// 構築後は不変。緯度・経度・ユーザー ID は必須で、timestamp はクライアントが
/// 省略した場合に受信時刻で補完された上でここに入ります。
#[derive(Debug, Clone, PartialEq)]
pub struct LocationEvent {
    pub user_id: UserId,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

impl LocationEvent {
    pub fn new(
        user_id: UserId,
        latitude: f64,
        longitude: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            latitude,
            longitude,
            timestamp,
            accuracy: None,
            speed: None,
            heading: None,
        }
    }

    pub fn with_motion(
        mut self,
        accuracy: Option<f64>,
        speed: Option<f64>,
        heading: Option<f64>,
    ) -> Self {
        self.accuracy = accuracy;
        self.speed = speed;
        self.heading = heading;
        self
    }
}

/// 永続化済みの位置情報レコード
///
/// `id` は耐久ストアが書き込んだ場合は行 ID、キャッシュが書き込んだ場合は
/// 合成された連番。呼び出し側はどちらのバックエンドが書いたかを区別しません。
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLocation {
    pub id: i64,
    pub event: LocationEvent,
}
