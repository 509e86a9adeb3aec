//! LeaderboardReporter の実装
//!
//! - `memory`: プロセス内に結果を保持する実装（既定）
//! - `http`: 外部のリーダーボードサービスへ JSON で POST する実装

pub mod http;
pub mod memory;

pub use http::HttpLeaderboardReporter;
pub use memory::InMemoryLeaderboardReporter;
