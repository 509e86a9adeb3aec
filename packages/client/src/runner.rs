//! Client execution logic with reconnection support.

use tokio::sync::mpsc;

use crate::{
    error::ClientError,
    formatter::RaceFormatter,
    reconnect::{BackoffPolicy, ReconnectAction, ReconnectController, ReconnectState},
    session::{SessionEnd, run_race_session},
    typing::TypingState,
    ui::InputEvent,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// e.g. `ws://127.0.0.1:8080`
    pub server_url: String,
    pub race_id: String,
    pub participant_id: String,
    pub display_name: Option<String>,
    /// Bot mode: type the prompt at this speed instead of reading stdin
    pub autotype_wpm: Option<f64>,
    pub backoff: BackoffPolicy,
}

/// Run the race client until the race finishes, the player quits, or the
/// reconnection controller gives up.
///
/// Every reconnect presents the same participant id so the room re-attaches
/// it instead of treating it as a new joiner.
pub async fn run_client(
    config: ClientConfig,
    mut input: mpsc::UnboundedReceiver<InputEvent>,
) -> Result<SessionEnd, ClientError> {
    let mut controller = ReconnectController::new(config.backoff);
    let mut typing = TypingState::new();
    let mut last_error = None;
    let mut action = controller.start();

    loop {
        match action {
            ReconnectAction::Connect { attempt } => {
                tracing::info!(
                    "Connecting to race '{}' as '{}' (attempt {})",
                    config.race_id,
                    config.participant_id,
                    attempt
                );
                match run_race_session(&config, &mut typing, &mut input, &mut controller).await {
                    Ok(end) => {
                        tracing::info!("Client session ended: {:?}", end);
                        controller.on_finished();
                        return Ok(end);
                    }
                    Err(e) => {
                        let kind = e.kind();
                        tracing::warn!("Session failed ({}): {}", kind.as_str(), e);
                        action = controller.on_failure(kind);
                        last_error = Some(e);
                    }
                }
            }
            ReconnectAction::Wait(delay) => {
                if let ReconnectState::Waiting { attempt, .. } = controller.state() {
                    print!(
                        "{}",
                        RaceFormatter::format_reconnecting(
                            attempt,
                            controller.policy().max_attempts(),
                            delay
                        )
                    );
                }
                tokio::time::sleep(delay).await;
                action = controller.on_wait_elapsed();
            }
            ReconnectAction::Stop => {
                return match last_error {
                    Some(e) => {
                        tracing::error!("Giving up: {}", e);
                        Err(e)
                    }
                    None => Ok(SessionEnd::Quit),
                };
            }
        }
    }
}
