//! Postgres による LocationBackend 実装
//!
//! 記録のバックエンド・オブ・レコード。書き込み時はユーザー行の存在を
//! 先に保証（upsert、既存ならエラーなし）してから位置情報行を insert します。
//!
//! ここで返るエラーは呼び出し側（PersistenceGateway）でキャッシュへの
//! フォールバックにより回復されます。クライアントには致命的エラーとして
//! 伝播しません。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    LocationBackend, LocationEvent, StoreError, StoredLocation, UserId,
};

/// `locations` テーブルの 1 行
#[derive(Debug, sqlx::FromRow)]
struct LocationRow {
    id: i64,
    user_id: String,
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
    speed: Option<f64>,
    heading: Option<f64>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<LocationRow> for StoredLocation {
    type Error = StoreError;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        let user_id = UserId::new(row.user_id)
            .map_err(|e| StoreError::Backend(format!("invalid user id in row: {e}")))?;
        let event = LocationEvent::new(user_id, row.latitude, row.longitude, row.recorded_at)
            .with_motion(row.accuracy, row.speed, row.heading);
        Ok(StoredLocation { id: row.id, event })
    }
}

/// Postgres 位置情報ストア
pub struct PostgresLocationStore {
    pool: PgPool,
}

impl PostgresLocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 起動時の疎通確認
    ///
    /// 失敗してもサーバーは起動し、キャッシュのみで動作します
    /// （可用性を耐久性より優先）。
    pub async fn probe(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    /// スキーママイグレーションを適用
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }

    /// ユーザー行の存在を保証（存在しなければプレースホルダを作成）
    async fn ensure_user(&self, user_id: &UserId) -> Result<(), StoreError> {
        let prefix: String = user_id.as_str().chars().take(8).collect();
        let placeholder_name = format!("guest_{prefix}");
        sqlx::query(
            r#"
            INSERT INTO users (user_id, display_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(placeholder_name)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl LocationBackend for PostgresLocationStore {
    async fn record(&self, event: &LocationEvent) -> Result<StoredLocation, StoreError> {
        self.ensure_user(&event.user_id).await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO locations
                (user_id, latitude, longitude, accuracy, speed, heading, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(event.user_id.as_str())
        .bind(event.latitude)
        .bind(event.longitude)
        .bind(event.accuracy)
        .bind(event.speed)
        .bind(event.heading)
        .bind(event.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(StoredLocation {
            id,
            event: event.clone(),
        })
    }

    async fn recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<StoredLocation>, StoreError> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, latitude, longitude, accuracy, speed, heading, recorded_at
            FROM locations
            WHERE user_id = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.into_iter().map(StoredLocation::try_from).collect()
    }
}
