//! ドメイン層
//!
//! リレーの中心となる値オブジェクト・エンティティ・trait 定義を提供します。
//! Infrastructure 層への依存は持ちません（依存性の逆転）。

pub mod entity;
pub mod error;
pub mod pusher;
pub mod store;
pub mod value_object;

pub use entity::{LocationEvent, StoredLocation};
pub use error::{PushError, RoomKeyError, StoreError, UserIdError};
pub use pusher::{MessagePusher, PusherChannel};
pub use store::LocationBackend;
pub use value_object::{RoomKey, SessionId, UserId};
