//! Server configuration loaded from environment variables.

use std::env;

/// Runtime configuration
///
/// すべての変数が省略可能です。`DATABASE_URL` が未設定、または
/// `USE_DATABASE=false` の場合はキャッシュのみの構成で起動します。
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres 接続文字列（未設定ならキャッシュのみ）
    pub database_url: Option<String>,
    /// 耐久ストアを使うか（`USE_DATABASE`, 既定 true）
    pub use_database: bool,
    /// インメモリキャッシュのユーザーごとの保持件数（`CACHE_CAPACITY`, 既定 100）
    pub cache_capacity: usize,
    /// 位置更新を全セッションへもブロードキャストするか（`BROADCAST_GLOBAL`, 既定 true）
    pub broadcast_global: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let use_database = env::var("USE_DATABASE")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);
        Config {
            database_url: env::var("DATABASE_URL").ok(),
            use_database,
            cache_capacity: env::var("CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            broadcast_global: env::var("BROADCAST_GLOBAL")
                .map(|v| !v.trim().eq_ignore_ascii_case("false"))
                .unwrap_or(true),
        }
    }
}
