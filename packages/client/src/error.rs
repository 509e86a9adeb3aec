//! Client error types.

use keyrace_server::infrastructure::dto::websocket::ErrorKind;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// The WebSocket link broke after it was established
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The server refused the upgrade (e.g. missing identity)
    #[error("Connection rejected with HTTP status {status}")]
    Rejected { status: u16 },

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    /// An `error` frame sent by the server
    #[error("{message}")]
    Server { kind: ErrorKind, message: String },
}

impl ClientError {
    /// Classification shown to the user and fed to the reconnection controller
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Network(_) => ErrorKind::Network,
            ClientError::WebSocket(_) => ErrorKind::Websocket,
            ClientError::Rejected { .. } | ClientError::InvalidUrl(_) => ErrorKind::Unknown,
            ClientError::Server { kind, .. } => *kind,
        }
    }
}

impl From<tungstenite::Error> for ClientError {
    fn from(error: tungstenite::Error) -> Self {
        match error {
            tungstenite::Error::Io(e) => ClientError::Network(e.to_string()),
            tungstenite::Error::Http(response) => ClientError::Rejected {
                status: response.status().as_u16(),
            },
            tungstenite::Error::Url(e) => ClientError::InvalidUrl(e.to_string()),
            other => ClientError::WebSocket(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_errors_are_retryable() {
        // テスト項目: ネットワーク断と WebSocket 断は再接続可能な種別に分類される
        // given (前提条件):
        let network = ClientError::from(tungstenite::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        )));
        let websocket = ClientError::from(tungstenite::Error::ConnectionClosed);

        // when (操作):
        let kinds = (network.kind(), websocket.kind());

        // then (期待する結果):
        assert_eq!(kinds, (ErrorKind::Network, ErrorKind::Websocket));
        assert!(kinds.0.is_retryable());
        assert!(kinds.1.is_retryable());
    }

    #[test]
    fn test_server_errors_keep_their_kind() {
        // テスト項目: サーバーから届いたエラーはその種別のまま扱われ、再接続対象にならない
        // given (前提条件):
        let error = ClientError::Server {
            kind: ErrorKind::RaceFull,
            message: "race is full (2 participants)".to_string(),
        };

        // when (操作):
        let kind = error.kind();

        // then (期待する結果):
        assert_eq!(kind, ErrorKind::RaceFull);
        assert!(!kind.is_retryable());
        assert_eq!(error.to_string(), "race is full (2 participants)");
    }

    #[test]
    fn test_rejected_upgrade_is_unknown() {
        // テスト項目: HTTP で拒否された接続は unknown に分類される
        // given (前提条件):
        let error = ClientError::Rejected { status: 401 };

        // when (操作):
        let kind = error.kind();

        // then (期待する結果):
        assert_eq!(kind, ErrorKind::Unknown);
    }
}
