//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::RaceSettings,
    domain::{IdentityProvider, LeaderboardReporter, PromptSource},
    room::{RoomManager, TokioClock},
    usecase::{JoinRaceUseCase, LeaveRaceUseCase, RecordProgressUseCase, StartRaceUseCase},
};

use super::{
    handler::{health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Typing race server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(settings, reporter, prompts, identity_provider);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    manager: Arc<RoomManager>,
}

impl Server {
    /// Wire the Room Manager and the use cases. Must be called inside a tokio runtime.
    pub fn new(
        settings: RaceSettings,
        reporter: Arc<dyn LeaderboardReporter>,
        prompts: Arc<dyn PromptSource>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let clock = TokioClock::new();
        let manager = RoomManager::with_clock(
            settings.room.clone(),
            settings.tombstone_ttl,
            reporter,
            prompts,
            clock,
        );

        let state = Arc::new(AppState {
            join_race_usecase: Arc::new(JoinRaceUseCase::new(manager.clone(), identity_provider)),
            record_progress_usecase: Arc::new(RecordProgressUseCase::new()),
            leave_race_usecase: Arc::new(LeaveRaceUseCase::new()),
            start_race_usecase: Arc::new(StartRaceUseCase::new()),
            session_settings: settings.session,
            clock,
        });

        Self { state, manager }
    }

    pub fn manager(&self) -> &Arc<RoomManager> {
        &self.manager
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws/races/{race_id}", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until the shutdown signal
    pub async fn serve(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();
        tracing::info!("Typing race server listening on {}", listener.local_addr()?);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Run the server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws/races/<race_id>?participant_id=<id>", bind_addr);
        self.serve(listener).await
    }
}
