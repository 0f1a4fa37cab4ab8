//! ドメイン層のエラー型定義

use thiserror::Error;

/// UserId の検証エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("user id must not be empty")]
    Empty,
    #[error("user id exceeds maximum length ({0} > 128)")]
    TooLong(usize),
}

/// RoomKey の検証エラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomKeyError {
    #[error("room id must not be empty")]
    EmptyRoomId,
}

/// ストレージバックエンドのエラー
///
/// 耐久ストア（Postgres）側の失敗はこの型に畳み込まれ、呼び出し側では
/// キャッシュへのフォールバックで回復されます。クライアントには伝播しません。
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// メッセージ送信（push）のエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("session '{0}' not found")]
    SessionNotFound(String),
    #[error("failed to push message: {0}")]
    PushFailed(String),
}
