//! WebSocket frame DTOs.
//!
//! Every frame is a JSON object internally tagged by `type`.

use serde::{Deserialize, Serialize};

// ========================================
// Client → Server
// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First frame of every connection
    Join,
    Progress { chars_typed: u32, errors: u32 },
    Heartbeat,
    /// Force-start request (host only)
    Start,
}

// ========================================
// Server → Client
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    State(RaceStateMessage),
    CountdownTick { remaining_secs: u32 },
    ProgressBroadcast(ProgressBroadcast),
    Finished(RaceResultMessage),
    Error { kind: ErrorKind, message: String },
}

impl ServerMessage {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceStateKind {
    Waiting,
    Countdown,
    Racing,
    Finished,
    Closed,
}

/// Full room snapshot, rendered per recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceStateMessage {
    pub race_id: String,
    pub state: RaceStateKind,
    pub prompt: String,
    pub participants: Vec<ParticipantInfo>,
    /// Authoritative race start (epoch ms)
    pub starts_at: Option<i64>,
    pub countdown_deadline: Option<i64>,
    /// Participant id of the recipient
    pub you: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub participant_id: String,
    pub display_name: String,
    pub chars_typed: u32,
    pub errors: u32,
    pub connected: bool,
    pub finished: bool,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressBroadcast {
    pub participant_id: String,
    pub chars_typed: u32,
    pub errors: u32,
    pub finished: bool,
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResultMessage {
    pub race_id: String,
    pub finished_at: i64,
    pub standings: Vec<StandingInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingInfo {
    pub participant_id: String,
    pub display_name: String,
    pub wpm: f64,
    pub accuracy: f64,
    pub finish_position: u32,
    pub dnf: bool,
    pub chars_typed: u32,
    pub errors: u32,
}

/// Failure taxonomy shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Websocket,
    RaceNotFound,
    RaceFull,
    RaceStarted,
    Unknown,
}

impl ErrorKind {
    /// Transport drops are worth another connection attempt; structural
    /// race errors are not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Websocket)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "network",
            ErrorKind::Websocket => "websocket",
            ErrorKind::RaceNotFound => "race_not_found",
            ErrorKind::RaceFull => "race_full",
            ErrorKind::RaceStarted => "race_started",
            ErrorKind::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_messages_are_tagged_by_type() {
        // テスト項目: クライアントメッセージは type タグ付きの JSON として解釈される
        // given (前提条件):
        let progress = r#"{"type":"progress","chars_typed":12,"errors":1}"#;
        let heartbeat = r#"{"type":"heartbeat"}"#;

        // when (操作):
        let progress: ClientMessage = serde_json::from_str(progress).unwrap();
        let heartbeat: ClientMessage = serde_json::from_str(heartbeat).unwrap();

        // then (期待する結果):
        assert_eq!(
            progress,
            ClientMessage::Progress {
                chars_typed: 12,
                errors: 1
            }
        );
        assert_eq!(heartbeat, ClientMessage::Heartbeat);
    }

    #[test]
    fn test_unknown_client_message_type_is_rejected() {
        // テスト項目: 未知の type はデコードエラーになる
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"chat","content":"hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_error_frame_shape() {
        // テスト項目: error フレームは kind を snake_case で持つ
        // given (前提条件):
        let message = ServerMessage::error(ErrorKind::RaceFull, "race is full");

        // when (操作):
        let json: serde_json::Value = serde_json::to_value(&message).unwrap();

        // then (期待する結果):
        assert_eq!(
            json,
            serde_json::json!({"type": "error", "kind": "race_full", "message": "race is full"})
        );
    }

    #[test]
    fn test_countdown_tick_shape() {
        // テスト項目: countdown_tick フレームの JSON 形状
        let json = serde_json::to_value(ServerMessage::CountdownTick { remaining_secs: 3 }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "countdown_tick", "remaining_secs": 3})
        );
    }

    #[test]
    fn test_only_transport_errors_are_retryable() {
        // テスト項目: network / websocket のみ再試行対象
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::Websocket.is_retryable());
        assert!(!ErrorKind::RaceNotFound.is_retryable());
        assert!(!ErrorKind::RaceFull.is_retryable());
        assert!(!ErrorKind::RaceStarted.is_retryable());
        assert!(!ErrorKind::Unknown.is_retryable());
    }
}
