//! 有界インメモリキャッシュによる LocationBackend 実装
//!
//! 耐久ストアが設定されていない・到達できない間のフォールバック先。
//! ユーザーごとに直近 `capacity` 件（既定 100 件）だけを保持し、
//! 超過時は最も古いエントリから追い出します。
//!
//! ID は行 ID の代わりに合成された連番を割り当てます。呼び出し側は
//! どちらのバックエンドが書いたかを区別しないため、ID の出どころも
//! 意識しません。

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{LocationBackend, LocationEvent, StoreError, StoredLocation, UserId};

/// 既定のユーザーあたり保持件数
pub const DEFAULT_CAPACITY: usize = 100;

/// 有界インメモリキャッシュ
pub struct MemoryLocationStore {
    /// Key: user_id, Value: 古い順の位置情報レコード
    ///
    /// append + evict を 1 つのロック下で行うため、同一ユーザーへの
    /// 並行書き込みでも更新が失われません。
    entries: Mutex<HashMap<String, VecDeque<StoredLocation>>>,
    /// ユーザーあたりの最大保持件数
    capacity: usize,
    /// 合成 ID の採番カウンタ
    next_id: AtomicI64,
}

impl MemoryLocationStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
            next_id: AtomicI64::new(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for MemoryLocationStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl LocationBackend for MemoryLocationStore {
    async fn record(&self, event: &LocationEvent) -> Result<StoredLocation, StoreError> {
        let stored = StoredLocation {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            event: event.clone(),
        };

        let mut entries = self.entries.lock().await;
        let user_entries = entries
            .entry(event.user_id.as_str().to_string())
            .or_default();
        user_entries.push_back(stored.clone());
        // 容量超過分は古い方から追い出す
        while user_entries.len() > self.capacity {
            user_entries.pop_front();
        }

        Ok(stored)
    }

    async fn recent(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<StoredLocation>, StoreError> {
        let entries = self.entries.lock().await;
        let Some(user_entries) = entries.get(user_id.as_str()) else {
            return Ok(Vec::new());
        };

        // 新しい順で limit 件
        Ok(user_entries.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 書き込み後の読み戻し（新しい順）
    // - 容量上限と最古エントリの追い出し
    // - 合成 ID の単調増加
    //
    // 【なぜこのテストが必要か】
    // - キャッシュは耐久ストア停止時の唯一の保存先であり、
    //   容量不変条件（ユーザーあたり <= capacity）はこの実装が保証する
    // ========================================

    fn event_at(user: &str, seq: i64) -> LocationEvent {
        LocationEvent::new(
            UserId::new(user.to_string()).unwrap(),
            13.75,
            100.50,
            Utc.timestamp_millis_opt(1672531200000 + seq).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_record_then_recent_returns_newest_first() {
        // テスト項目: 書き込んだイベントが新しい順で読み戻せる
        // given (前提条件):
        let store = MemoryLocationStore::default();
        let alice = UserId::new("alice".to_string()).unwrap();
        store.record(&event_at("alice", 1)).await.unwrap();
        store.record(&event_at("alice", 2)).await.unwrap();
        store.record(&event_at("alice", 3)).await.unwrap();

        // when (操作):
        let result = store.recent(&alice, 10).await.unwrap();

        // then (期待する結果): 新しい順
        assert_eq!(result.len(), 3);
        assert!(result[0].event.timestamp > result[1].event.timestamp);
        assert!(result[1].event.timestamp > result[2].event.timestamp);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_entry() {
        // テスト項目: 101 件書き込むと 100 件だけが残り、最古の 1 件が消える
        // given (前提条件):
        let store = MemoryLocationStore::new(100);
        let alice = UserId::new("alice".to_string()).unwrap();
        let oldest = event_at("alice", 0);
        store.record(&oldest).await.unwrap();
        for seq in 1..=100 {
            store.record(&event_at("alice", seq)).await.unwrap();
        }

        // when (操作):
        let result = store.recent(&alice, 200).await.unwrap();

        // then (期待する結果): ちょうど 100 件、最古のイベントは含まれない
        assert_eq!(result.len(), 100);
        assert!(result.iter().all(|r| r.event.timestamp != oldest.timestamp));
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        // テスト項目: limit が保持件数より小さい場合は limit 件だけ返す
        // given (前提条件):
        let store = MemoryLocationStore::default();
        let alice = UserId::new("alice".to_string()).unwrap();
        for seq in 0..10 {
            store.record(&event_at("alice", seq)).await.unwrap();
        }

        // when (操作):
        let result = store.recent(&alice, 3).await.unwrap();

        // then (期待する結果):
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn test_recent_for_unknown_user_returns_empty() {
        // テスト項目: 履歴のないユーザーは空の Vec（エラーではない）
        // given (前提条件):
        let store = MemoryLocationStore::default();
        let unknown = UserId::new("nobody".to_string()).unwrap();

        // when (操作):
        let result = store.recent(&unknown, 10).await;

        // then (期待する結果):
        assert_eq!(result.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_synthetic_ids_are_monotonic() {
        // テスト項目: 合成 ID が書き込み順に単調増加する
        // given (前提条件):
        let store = MemoryLocationStore::default();

        // when (操作):
        let first = store.record(&event_at("alice", 1)).await.unwrap();
        let second = store.record(&event_at("bob", 2)).await.unwrap();

        // then (期待する結果):
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        // テスト項目: ユーザーごとにエントリが分離されている
        // given (前提条件):
        let store = MemoryLocationStore::default();
        let alice = UserId::new("alice".to_string()).unwrap();
        let bob = UserId::new("bob".to_string()).unwrap();
        store.record(&event_at("alice", 1)).await.unwrap();
        store.record(&event_at("bob", 2)).await.unwrap();

        // when (操作):
        let alice_entries = store.recent(&alice, 10).await.unwrap();
        let bob_entries = store.recent(&bob, 10).await.unwrap();

        // then (期待する結果):
        assert_eq!(alice_entries.len(), 1);
        assert_eq!(bob_entries.len(), 1);
        assert_eq!(alice_entries[0].event.user_id.as_str(), "alice");
        assert_eq!(bob_entries[0].event.user_id.as_str(), "bob");
    }
}
