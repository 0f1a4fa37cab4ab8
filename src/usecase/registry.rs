//! SessionRegistry — 接続とユーザー識別の対応を管理
//!
//! セッションの生成・破棄はここが唯一の所有者です。RoomRouter は
//! メンバーシップの参照だけを持ち、セッション自体は所有しません。
//!
//! ユーザー識別のバインド時には自分以外の全セッションへ
//! `user-online` を、切断時には `user-offline` をブロードキャストします。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{RoomKey, SessionId, UserId};
use crate::infrastructure::dto::websocket::{UserOfflineMessage, UserOnlineMessage};

use super::router::RoomRouter;

/// 生きている接続のレジストリ
pub struct SessionRegistry {
    /// Key: SessionId, Value: バインド済みユーザー識別（未バインドなら None）
    sessions: Mutex<HashMap<SessionId, Option<UserId>>>,
    router: Arc<RoomRouter>,
}

impl SessionRegistry {
    pub fn new(router: Arc<RoomRouter>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            router,
        }
    }

    /// 未バインドのセッションを登録（同一セッションの再登録は no-op）
    pub async fn register(&self, session_id: SessionId) {
        let mut sessions = self.sessions.lock().await;
        sessions.entry(session_id).or_insert(None);
        tracing::info!("Session '{}' registered", session_id);
    }

    /// セッションにユーザー識別をバインド
    ///
    /// 副作用として自分のユーザールーム（`user-<id>`）へ暗黙に subscribe し、
    /// 自分以外の全セッションへ `user-online` を通知します。
    pub async fn bind_user(&self, session_id: SessionId, user_id: UserId) {
        {
            let mut sessions = self.sessions.lock().await;
            let Some(binding) = sessions.get_mut(&session_id) else {
                tracing::warn!(
                    "Cannot bind user '{}': session '{}' not registered",
                    user_id,
                    session_id
                );
                return;
            };
            *binding = Some(user_id.clone());
        }

        // 自分のユーザールームへ暗黙に参加
        self.router
            .subscribe(session_id, RoomKey::user(user_id.clone()))
            .await;

        tracing::info!("User '{}' bound to session '{}'", user_id, session_id);

        // 自分以外へプレゼンス通知
        let online = UserOnlineMessage::new(user_id.into_string());
        let json = serde_json::to_string(&online).unwrap();
        if let Err(e) = self.router.broadcast_all(&json, Some(session_id)).await {
            tracing::warn!("Failed to broadcast user-online: {}", e);
        }
    }

    /// セッションを破棄
    ///
    /// 属していた全ルームから削除し、ユーザー識別がバインドされていた場合は
    /// 残りのセッションへ `user-offline` を通知します。
    /// 未登録セッションに対しては no-op（冪等）。
    pub async fn deregister(&self, session_id: SessionId) {
        let bound_user = {
            let mut sessions = self.sessions.lock().await;
            match sessions.remove(&session_id) {
                Some(binding) => binding,
                None => return,
            }
        };

        self.router.remove_session(&session_id).await;
        tracing::info!("Session '{}' deregistered", session_id);

        if let Some(user_id) = bound_user {
            let offline = UserOfflineMessage::new(user_id.into_string());
            let json = serde_json::to_string(&offline).unwrap();
            if let Err(e) = self.router.broadcast_all(&json, Some(session_id)).await {
                tracing::warn!("Failed to broadcast user-offline: {}", e);
            }
        }
    }

    /// セッションにバインドされたユーザー識別を取得
    pub async fn user_id_for(&self, session_id: &SessionId) -> Option<UserId> {
        let sessions = self.sessions.lock().await;
        sessions.get(session_id).cloned().flatten()
    }

    /// 生きているセッション数
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.lock().await;
        sessions.len()
    }
}
