//! UseCase 層 — リレーの 4 コンポーネント
//!
//! - `SessionRegistry`: 接続とユーザー識別の対応を管理
//! - `RoomRouter`: ルーム購読とファンアウト先の計算
//! - `PersistenceGateway`: 耐久ストア / キャッシュへの二重バックエンド永続化
//! - `EventDispatcher`: インバウンドイベントの検証・永続化・配信の統括

pub mod dispatcher;
pub mod gateway;
pub mod registry;
pub mod router;

pub use dispatcher::EventDispatcher;
pub use gateway::PersistenceGateway;
pub use registry::SessionRegistry;
pub use router::RoomRouter;
