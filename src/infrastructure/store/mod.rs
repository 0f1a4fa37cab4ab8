//! 位置情報ストレージの実装
//!
//! `LocationBackend` trait の具体的な実装を提供します。
//!
//! - `postgres`: 耐久ストア（記録のバックエンド・オブ・レコード）
//! - `memory`: 耐久ストアが使えない間の有界インメモリキャッシュ

pub mod memory;
pub mod postgres;

pub use memory::MemoryLocationStore;
pub use postgres::PostgresLocationStore;
