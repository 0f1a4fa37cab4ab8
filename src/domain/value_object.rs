//! 値オブジェクト定義
//!
//! セッション・ユーザー・ルームを識別する型。生の `String` をそのまま
//! 持ち回らず、検証済みの型でレイヤー間を受け渡します。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{RoomKeyError, UserIdError};

/// 接続 1 本を識別する不透明な ID
///
/// クライアントは選択できず、接続受付時にサーバー側で生成されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh session id (UUID v4)
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ユーザー識別子（検証済みの非空文字列）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: String) -> Result<Self, UserIdError> {
        if value.is_empty() {
            return Err(UserIdError::Empty);
        }
        if value.len() > 128 {
            return Err(UserIdError::TooLong(value.len()));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = UserIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ルームキー
///
/// `user-<id>`: ユーザー個人のルーム（そのユーザーの位置更新の配信先）
/// `room-<id>`: グループ追跡用のルーム
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    User(UserId),
    Group(String),
}

impl RoomKey {
    /// Build the per-user room key for a user
    pub fn user(user_id: UserId) -> Self {
        Self::User(user_id)
    }

    /// Build a group room key; the id must be non-empty
    pub fn group(room_id: String) -> Result<Self, RoomKeyError> {
        if room_id.is_empty() {
            return Err(RoomKeyError::EmptyRoomId);
        }
        Ok(Self::Group(room_id))
    }

    /// Render the wire form of the key (`user-<id>` / `room-<id>`)
    pub fn key(&self) -> String {
        match self {
            Self::User(user_id) => format!("user-{}", user_id.as_str()),
            Self::Group(room_id) => format!("room-{}", room_id),
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_is_unique() {
        // テスト項目: 生成された SessionId が一意である
        // given (前提条件):

        // when (操作):
        let first = SessionId::generate();
        let second = SessionId::generate();

        // then (期待する結果):
        assert_ne!(first, second);
    }

    #[test]
    fn test_user_id_accepts_valid_value() {
        // テスト項目: 非空の文字列から UserId を生成できる
        // given (前提条件):
        let value = "alice".to_string();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "alice");
    }

    #[test]
    fn test_user_id_rejects_empty_value() {
        // テスト項目: 空文字列の UserId は拒否される
        // given (前提条件):
        let value = String::new();

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(UserIdError::Empty));
    }

    #[test]
    fn test_user_id_rejects_too_long_value() {
        // テスト項目: 128 文字を超える UserId は拒否される
        // given (前提条件):
        let value = "a".repeat(129);

        // when (操作):
        let result = UserId::new(value);

        // then (期待する結果):
        assert_eq!(result, Err(UserIdError::TooLong(129)));
    }

    #[test]
    fn test_room_key_user_format() {
        // テスト項目: ユーザールームのキーが `user-<id>` 形式になる
        // given (前提条件):
        let user_id = UserId::new("alice".to_string()).unwrap();

        // when (操作):
        let key = RoomKey::user(user_id);

        // then (期待する結果):
        assert_eq!(key.key(), "user-alice");
    }

    #[test]
    fn test_room_key_group_format() {
        // テスト項目: グループルームのキーが `room-<id>` 形式になる
        // given (前提条件):
        let room_id = "convoy-1".to_string();

        // when (操作):
        let key = RoomKey::group(room_id).unwrap();

        // then (期待する結果):
        assert_eq!(key.key(), "room-convoy-1");
    }

    #[test]
    fn test_room_key_group_rejects_empty_id() {
        // テスト項目: 空のグループ ID は拒否される
        // given (前提条件):
        let room_id = String::new();

        // when (操作):
        let result = RoomKey::group(room_id);

        // then (期待する結果):
        assert_eq!(result, Err(RoomKeyError::EmptyRoomId));
    }

    #[test]
    fn test_room_keys_with_same_id_are_equal() {
        // テスト項目: 同じ ID から作られた RoomKey は等しい（HashMap のキーとして使える）
        // given (前提条件):
        let alice = UserId::new("alice".to_string()).unwrap();

        // when (操作):
        let first = RoomKey::user(alice.clone());
        let second = RoomKey::user(alice);

        // then (期待する結果):
        assert_eq!(first, second);
    }
}
