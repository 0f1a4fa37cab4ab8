//! ワイヤ形式の DTO 定義
//!
//! ドメインモデルをそのままシリアライズせず、WebSocket / HTTP の
//! ワイヤ形式（camelCase, type タグ付き）into/from で変換します。

pub mod http;
pub mod websocket;
