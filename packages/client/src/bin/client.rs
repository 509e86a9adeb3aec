//! Typing race client with automatic reconnection.
//!
//! Connects to a keyrace server, joins a race and sends typing progress.
//! Interactive mode reads typed lines from the terminal (`/start` asks the
//! server to start early, `/quit` leaves); `--autotype-wpm` runs a bot.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin keyrace-client -- --race-id lobby --participant-id alice
//! cargo run --bin keyrace-client -- -r lobby -i bot1 --autotype-wpm 80
//! ```

use std::time::Duration;

use clap::Parser;
use keyrace_client::{ClientConfig, reconnect::BackoffPolicy, run_client, ui::spawn_input_reader};
use keyrace_shared::logger::setup_logger;
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "keyrace-client")]
#[command(about = "Typing race client with reconnection support", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    #[arg(short = 'r', long)]
    race_id: String,

    #[arg(short = 'i', long)]
    participant_id: String,

    #[arg(short = 'n', long)]
    display_name: Option<String>,

    /// Type automatically at this speed instead of reading the terminal
    #[arg(long)]
    autotype_wpm: Option<f64>,

    #[arg(long, default_value = "5")]
    max_reconnect_attempts: u32,

    #[arg(long, default_value = "500")]
    backoff_base_ms: u64,

    #[arg(long, default_value = "8000")]
    backoff_max_ms: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Bot mode keeps the sender so the input channel never closes
    let (_bot_input, input) = match args.autotype_wpm {
        Some(_) => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Some(tx), rx)
        }
        None => (None, spawn_input_reader(args.participant_id.clone())),
    };

    let config = ClientConfig {
        server_url: args.url,
        race_id: args.race_id,
        participant_id: args.participant_id,
        display_name: args.display_name,
        autotype_wpm: args.autotype_wpm,
        backoff: BackoffPolicy::new(
            Duration::from_millis(args.backoff_base_ms),
            Duration::from_millis(args.backoff_max_ms),
            args.max_reconnect_attempts,
        ),
    };

    if let Err(e) = run_client(config, input).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
