//! RoomRouter — ルーム購読管理とファンアウト
//!
//! ルームはセッションの集合で、最初の subscribe で遅延生成され、
//! 空になった時点で削除されます。メンバーシップは双方向
//! （room → sessions / session → rooms）を 1 つのロック下で保持するため、
//! ファンアウト時のスナップショットは常に整合しています。
//!
//! ユーザー個人ルーム（`user-<id>`）により、配信先の計算が
//! 全セッションの走査ではなく購読者数に比例します。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{MessagePusher, PushError, RoomKey, SessionId};

/// ルームとメンバーシップの双方向テーブル
#[derive(Default)]
struct RoomTable {
    /// Key: RoomKey, Value: ルームのメンバー
    rooms: HashMap<RoomKey, HashSet<SessionId>>,
    /// Key: SessionId, Value: そのセッションが属するルーム
    memberships: HashMap<SessionId, HashSet<RoomKey>>,
}

/// ルームベースの publish/subscribe ルーター
pub struct RoomRouter {
    table: Mutex<RoomTable>,
    pusher: Arc<dyn MessagePusher>,
}

impl RoomRouter {
    pub fn new(pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            table: Mutex::new(RoomTable::default()),
            pusher,
        }
    }

    /// セッションをルームに追加（ルームがなければ作成）
    pub async fn subscribe(&self, session_id: SessionId, room_key: RoomKey) {
        let mut table = self.table.lock().await;
        table
            .rooms
            .entry(room_key.clone())
            .or_default()
            .insert(session_id);
        table
            .memberships
            .entry(session_id)
            .or_default()
            .insert(room_key.clone());
        tracing::debug!("Session '{}' subscribed to '{}'", session_id, room_key);
    }

    /// セッションをルームから削除（冪等; 空になったルームは削除）
    pub async fn unsubscribe(&self, session_id: &SessionId, room_key: &RoomKey) {
        let mut table = self.table.lock().await;
        if let Some(members) = table.rooms.get_mut(room_key) {
            members.remove(session_id);
            if members.is_empty() {
                table.rooms.remove(room_key);
            }
        }
        if let Some(rooms) = table.memberships.get_mut(session_id) {
            rooms.remove(room_key);
            if rooms.is_empty() {
                table.memberships.remove(session_id);
            }
        }
        tracing::debug!("Session '{}' unsubscribed from '{}'", session_id, room_key);
    }

    /// セッションを全てのルームから削除（切断時に呼ばれる）
    pub async fn remove_session(&self, session_id: &SessionId) {
        let mut table = self.table.lock().await;
        let Some(rooms) = table.memberships.remove(session_id) else {
            return;
        };
        for room_key in rooms {
            if let Some(members) = table.rooms.get_mut(&room_key) {
                members.remove(session_id);
                if members.is_empty() {
                    table.rooms.remove(&room_key);
                }
            }
        }
        tracing::debug!("Session '{}' removed from all rooms", session_id);
    }

    /// セッションが現在属しているルームの一覧
    pub async fn membership_of(&self, session_id: &SessionId) -> Vec<RoomKey> {
        let table = self.table.lock().await;
        table
            .memberships
            .get(session_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// ルームの現在のメンバー一覧
    pub async fn members_of(&self, room_key: &RoomKey) -> Vec<SessionId> {
        let table = self.table.lock().await;
        table
            .rooms
            .get(room_key)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// ルームの全メンバーへ配信
    ///
    /// メンバー集合はロック下でスナップショットし、送信自体はロック外で
    /// 行います。各メンバーには 1 回の呼び出しにつき最大 1 回届きます。
    pub async fn fan_out(
        &self,
        room_key: &RoomKey,
        content: &str,
        exclude: Option<SessionId>,
    ) -> Result<(), PushError> {
        let targets: Vec<SessionId> = {
            let table = self.table.lock().await;
            table
                .rooms
                .get(room_key)
                .map(|members| {
                    members
                        .iter()
                        .filter(|id| Some(**id) != exclude)
                        .copied()
                        .collect()
                })
                .unwrap_or_default()
        };

        if targets.is_empty() {
            return Ok(());
        }
        self.pusher.broadcast(targets, content).await
    }

    /// 生きている全セッションへ配信（プレゼンス通知・全体ブロードキャスト用）
    pub async fn broadcast_all(
        &self,
        content: &str,
        exclude: Option<SessionId>,
    ) -> Result<(), PushError> {
        self.pusher.broadcast_all(content, exclude).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::infrastructure::pusher::WebSocketMessagePusher;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - subscribe / unsubscribe / remove_session によるメンバーシップの変化
    // - 双方向テーブル（rooms / memberships）の整合性
    // - fan_out のターゲット選定（除外・ルーム分離・at-most-once）
    //
    // 【なぜこのテストが必要か】
    // - ルーム分離はプライバシーに直結する（他ユーザーのルーム宛の
    //   位置情報が届いてはならない）
    // - 空ルームの削除とメンバーシップの冪等性はリソースリークの防止に必要
    // ========================================

    fn user_room(id: &str) -> RoomKey {
        RoomKey::user(UserId::new(id.to_string()).unwrap())
    }

    async fn setup() -> (RoomRouter, Arc<WebSocketMessagePusher>) {
        let pusher = Arc::new(WebSocketMessagePusher::new());
        let router = RoomRouter::new(pusher.clone());
        (router, pusher)
    }

    async fn connect(pusher: &WebSocketMessagePusher) -> (SessionId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = SessionId::generate();
        pusher.register_session(session_id, tx).await;
        (session_id, rx)
    }

    #[tokio::test]
    async fn test_subscribe_creates_room_lazily() {
        // テスト項目: 最初の subscribe でルームが作成される
        // given (前提条件):
        let (router, _pusher) = setup().await;
        let session = SessionId::generate();
        let room = user_room("alice");
        assert_eq!(router.members_of(&room).await.len(), 0);

        // when (操作):
        router.subscribe(session, room.clone()).await;

        // then (期待する結果):
        assert_eq!(router.members_of(&room).await, vec![session]);
        assert_eq!(router.membership_of(&session).await, vec![room]);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_member_and_prunes_empty_room() {
        // テスト項目: 最後のメンバーが抜けたルームは削除される
        // given (前提条件):
        let (router, _pusher) = setup().await;
        let session = SessionId::generate();
        let room = user_room("alice");
        router.subscribe(session, room.clone()).await;

        // when (操作):
        router.unsubscribe(&session, &room).await;

        // then (期待する結果): 双方向とも空
        assert_eq!(router.members_of(&room).await.len(), 0);
        assert_eq!(router.membership_of(&session).await.len(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        // テスト項目: メンバーでないセッションの unsubscribe は no-op
        // given (前提条件):
        let (router, _pusher) = setup().await;
        let member = SessionId::generate();
        let outsider = SessionId::generate();
        let room = user_room("alice");
        router.subscribe(member, room.clone()).await;

        // when (操作):
        router.unsubscribe(&outsider, &room).await;
        router.unsubscribe(&outsider, &room).await;

        // then (期待する結果): 既存メンバーは影響を受けない
        assert_eq!(router.members_of(&room).await, vec![member]);
    }

    #[tokio::test]
    async fn test_remove_session_clears_all_memberships() {
        // テスト項目: remove_session で全ルームからセッションが削除される
        // given (前提条件):
        let (router, _pusher) = setup().await;
        let session = SessionId::generate();
        let room_a = user_room("alice");
        let room_b = RoomKey::group("convoy-1".to_string()).unwrap();
        router.subscribe(session, room_a.clone()).await;
        router.subscribe(session, room_b.clone()).await;

        // when (操作):
        router.remove_session(&session).await;

        // then (期待する結果):
        assert_eq!(router.members_of(&room_a).await.len(), 0);
        assert_eq!(router.members_of(&room_b).await.len(), 0);
        assert_eq!(router.membership_of(&session).await.len(), 0);
    }

    #[tokio::test]
    async fn test_fan_out_delivers_to_members_only() {
        // テスト項目: ルーム宛のファンアウトがメンバーだけに届く（ルーム分離）
        // given (前提条件):
        let (router, pusher) = setup().await;
        let (subscriber, mut sub_rx) = connect(&pusher).await;
        let (outsider, mut out_rx) = connect(&pusher).await;
        let room_a = user_room("user-a");
        let room_b = user_room("user-b");
        router.subscribe(subscriber, room_a.clone()).await;
        router.subscribe(outsider, room_b).await;

        // when (操作): user-a のルームへファンアウト
        router.fan_out(&room_a, "location", None).await.unwrap();

        // then (期待する結果): room_b のみのセッションには届かない
        assert_eq!(sub_rx.recv().await, Some("location".to_string()));
        assert!(out_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fan_out_excludes_specified_session() {
        // テスト項目: exclude に指定したセッションには届かない（エコー防止）
        // given (前提条件):
        let (router, pusher) = setup().await;
        let (sender, mut sender_rx) = connect(&pusher).await;
        let (other, mut other_rx) = connect(&pusher).await;
        let room = user_room("alice");
        router.subscribe(sender, room.clone()).await;
        router.subscribe(other, room.clone()).await;

        // when (操作):
        router.fan_out(&room, "location", Some(sender)).await.unwrap();

        // then (期待する結果):
        assert_eq!(other_rx.recv().await, Some("location".to_string()));
        assert!(sender_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fan_out_delivers_at_most_once_per_member() {
        // テスト項目: 1 回の fan_out で各メンバーに最大 1 回しか届かない
        // given (前提条件):
        let (router, pusher) = setup().await;
        let (session, mut rx) = connect(&pusher).await;
        let room = user_room("alice");
        router.subscribe(session, room.clone()).await;
        // 重複 subscribe してもメンバー集合は 1 件のまま
        router.subscribe(session, room.clone()).await;

        // when (操作):
        router.fan_out(&room, "location", None).await.unwrap();

        // then (期待する結果):
        assert_eq!(rx.recv().await, Some("location".to_string()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fan_out_to_unknown_room_is_noop() {
        // テスト項目: 存在しないルームへのファンアウトはエラーにならない
        // given (前提条件):
        let (router, _pusher) = setup().await;

        // when (操作):
        let result = router.fan_out(&user_room("ghost"), "location", None).await;

        // then (期待する結果):
        assert!(result.is_ok());
    }
}
