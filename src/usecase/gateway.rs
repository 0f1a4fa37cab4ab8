//! PersistenceGateway — 二重バックエンドの永続化ポリシー
//!
//! 耐久ストア（Postgres）が健全なら耐久ストアへ、そうでなければ有界
//! インメモリキャッシュへ書き込みます。耐久ストアへの書き込み失敗は
//! 呼び出し側に致命的エラーとして伝播せず、そのイベントだけを
//! キャッシュへフォールバックします（リトライループなしの 1 回試行、
//! 可用性を耐久性より優先）。
//!
//! 健全性フラグは起動時の疎通確認で決まり、以後は変化しません。
//! 障害中の書き込みはイベントごとに耐久ストアを再試行するため、
//! ストアが復帰すれば次のイベントから自然に耐久パスへ戻ります。
//!
//! 読み戻しは耐久ストア（健全時）とキャッシュをマージして新しい順に
//! 返します。障害をまたいだイベント列も 1 つの読み出しで見えます。

use std::sync::Arc;

use crate::domain::{LocationBackend, LocationEvent, StoreError, StoredLocation, UserId};

/// 位置情報永続化のゲートウェイ
///
/// 呼び出し側はどちらのバックエンドが書き込み・読み出しを担ったかを
/// 区別しません。
pub struct PersistenceGateway {
    durable: Option<Arc<dyn LocationBackend>>,
    cache: Arc<dyn LocationBackend>,
}

impl PersistenceGateway {
    /// 耐久ストアなし（キャッシュのみ）で構築
    pub fn cache_only(cache: Arc<dyn LocationBackend>) -> Self {
        Self {
            durable: None,
            cache,
        }
    }

    /// 疎通確認済みの耐久ストア付きで構築
    pub fn with_durable(durable: Arc<dyn LocationBackend>, cache: Arc<dyn LocationBackend>) -> Self {
        Self {
            durable: Some(durable),
            cache,
        }
    }

    /// 耐久ストアが構成されているか
    pub fn is_durable(&self) -> bool {
        self.durable.is_some()
    }

    /// 位置情報イベントを記録する
    ///
    /// 耐久ストアへの 1 回の書き込み試行が失敗した場合は warn ログの上、
    /// このイベントをキャッシュへ書き込みます。
    pub async fn record_location(&self, event: &LocationEvent) -> Result<StoredLocation, StoreError> {
        if let Some(durable) = &self.durable {
            match durable.record(event).await {
                Ok(stored) => return Ok(stored),
                Err(e) => {
                    tracing::warn!(
                        "Durable store write failed for user '{}', falling back to cache: {}",
                        event.user_id,
                        e
                    );
                }
            }
        }

        self.cache.record(event).await
    }

    /// 直近の位置情報を新しい順で最大 `limit` 件返す
    ///
    /// 耐久ストア（健全時）とキャッシュの両方を読み、タイムスタンプの
    /// 新しい順にマージして limit 件に切り詰めます。履歴のないユーザーは
    /// 空の Vec（エラーではない）。
    pub async fn recent_locations(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<StoredLocation>, StoreError> {
        let mut records = self.cache.recent(user_id, limit).await?;

        if let Some(durable) = &self.durable {
            match durable.recent(user_id, limit).await {
                Ok(durable_records) => records.extend(durable_records),
                Err(e) => {
                    tracing::warn!(
                        "Durable store read failed for user '{}', serving cache only: {}",
                        user_id,
                        e
                    );
                }
            }
        }

        records.sort_by(|a, b| b.event.timestamp.cmp(&a.event.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}
