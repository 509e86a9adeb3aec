//! Typing race server.
//!
//! Accepts WebSocket connections at `/ws/races/{race_id}` and coordinates
//! each race in its own room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin keyrace-server
//! cargo run --bin keyrace-server -- --host 0.0.0.0 --port 3000 --countdown-secs 5
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use keyrace_server::{
    config::{RaceSettings, SessionSettings},
    domain::{LeaderboardReporter, RoomSettings},
    infrastructure::{
        identity::QueryIdentityProvider,
        prompt::BuiltinPromptCatalog,
        reporter::{HttpLeaderboardReporter, InMemoryLeaderboardReporter},
    },
    ui::Server,
};
use keyrace_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "keyrace-server")]
#[command(about = "Multiplayer typing race server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "KEYRACE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "KEYRACE_PORT", default_value = "8080")]
    port: u16,

    #[arg(
        long,
        default_value = "5",
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    max_participants: usize,

    /// Roster size that starts the countdown
    #[arg(long, default_value = "2")]
    min_participants: usize,

    #[arg(long, default_value = "10")]
    countdown_secs: u64,

    #[arg(long, default_value = "180")]
    race_duration_secs: u64,

    /// How long a running race may have no connected participant
    #[arg(long, default_value = "30")]
    idle_grace_secs: u64,

    /// How long a waiting room may stay empty
    #[arg(long, default_value = "60")]
    empty_room_timeout_secs: u64,

    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_interval_secs: u64,

    #[arg(long, default_value = "3")]
    max_missed_heartbeats: u32,

    /// How long a new connection may take to send `join`
    #[arg(long, default_value = "10")]
    join_timeout_secs: u64,

    #[arg(long, default_value = "5")]
    report_max_attempts: u32,

    /// Initial report retry delay, doubled per attempt
    #[arg(long, default_value = "500")]
    report_backoff_ms: u64,

    /// Leaderboard service base URL (in-memory leaderboard when unset)
    #[arg(long, env = "KEYRACE_LEADERBOARD_URL")]
    leaderboard_url: Option<String>,

    #[arg(long, default_value = "5")]
    leaderboard_timeout_secs: u64,

    /// How long a completed race id keeps answering `race_not_found`
    #[arg(long, default_value = "600")]
    tombstone_ttl_secs: u64,
}

impl Args {
    fn settings(&self) -> RaceSettings {
        RaceSettings {
            room: RoomSettings {
                max_participants: self.max_participants,
                min_participants: self.min_participants,
                countdown: Duration::from_secs(self.countdown_secs),
                race_duration: Duration::from_secs(self.race_duration_secs),
                idle_grace: Duration::from_secs(self.idle_grace_secs),
                empty_room_timeout: Duration::from_secs(self.empty_room_timeout_secs),
                report_max_attempts: self.report_max_attempts,
                report_backoff: Duration::from_millis(self.report_backoff_ms),
                ..RoomSettings::default()
            },
            session: SessionSettings {
                heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
                max_missed_heartbeats: self.max_missed_heartbeats,
                join_timeout: Duration::from_secs(self.join_timeout_secs),
            },
            tombstone_ttl: Duration::from_secs(self.tombstone_ttl_secs),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let settings = args.settings();

    // 1. Leaderboard reporter
    let reporter: Arc<dyn LeaderboardReporter> = match &args.leaderboard_url {
        Some(url) => {
            match HttpLeaderboardReporter::new(
                url.clone(),
                Duration::from_secs(args.leaderboard_timeout_secs),
            ) {
                Ok(reporter) => {
                    tracing::info!("Reporting results to {}", url);
                    Arc::new(reporter)
                }
                Err(e) => {
                    tracing::error!("Failed to build leaderboard client: {}", e);
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::info!("No leaderboard URL configured, keeping results in memory");
            Arc::new(InMemoryLeaderboardReporter::new())
        }
    };

    // 2. Server (Room Manager, UseCases, AppState)
    let server = Server::new(
        settings,
        reporter,
        Arc::new(BuiltinPromptCatalog::new()),
        Arc::new(QueryIdentityProvider::new()),
    );

    // 3. Run
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        // テスト項目: 引数なしで既定値が採用される
        // given (前提条件):
        let argv = ["keyrace-server"];

        // when (操作):
        let args = Args::try_parse_from(argv).unwrap();

        // then (期待する結果):
        assert_eq!(args.max_participants, 5);
        assert_eq!(args.heartbeat_interval_secs, 5);
    }

    #[test]
    fn test_zero_heartbeat_interval_is_rejected() {
        // テスト項目: ハートビート間隔 0 秒は起動時に拒否される
        // given (前提条件):
        let argv = ["keyrace-server", "--heartbeat-interval-secs", "0"];

        // when (操作):
        let result = Args::try_parse_from(argv);

        // then (期待する結果):
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_max_participants_is_rejected() {
        // テスト項目: 定員 0 人は起動時に拒否される
        // given (前提条件):
        let argv = ["keyrace-server", "--max-participants", "0"];

        // when (操作):
        let result = Args::try_parse_from(argv);

        // then (期待する結果):
        assert!(result.is_err());
    }
}
