//! LocationBackend trait 定義
//!
//! 位置情報ストレージのインターフェース。耐久ストア（Postgres）と
//! 有界インメモリキャッシュの両方がこの trait を実装し、
//! PersistenceGateway が構築時にどちらを使うかを組み立てます。
//! 呼び出し側はバックエンドの種類で分岐しません。

use async_trait::async_trait;

use super::entity::{LocationEvent, StoredLocation};
use super::error::StoreError;
use super::value_object::UserId;

/// 位置情報ストレージの抽象化
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationBackend: Send + Sync {
    /// 位置情報イベントを 1 件書き込み、永続化済みレコードを返す
    async fn record(&self, event: &LocationEvent) -> Result<StoredLocation, StoreError>;

    /// 指定ユーザーの直近の位置情報を新しい順で最大 `limit` 件返す
    ///
    /// 履歴のないユーザーは空の Vec（エラーにはならない）。
    async fn recent(&self, user_id: &UserId, limit: usize) -> Result<Vec<StoredLocation>, StoreError>;
}
