//! Session: one participant's transport link to a room.
//!
//! The Session owns no race state. It decodes inbound frames, tracks
//! liveness, and decides when the link is dead; the room decides what a
//! dead link means for the participant.
//!
//! ```text
//! Connecting ──attach──▶ Open ◀──frame──▶ Reconnecting
//!      │                  │                    │
//!      └──────────────────┴──detach / lost─────┴──▶ Closed
//! ```

use thiserror::Error;

use crate::{
    config::SessionSettings,
    domain::{ParticipantId, SessionId, Timestamp},
    infrastructure::dto::websocket::ClientMessage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upgraded, waiting for `join`
    Connecting,
    Open,
    /// At least one heartbeat interval passed in silence
    Reconnecting,
    Closed,
}

/// Validated inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundEvent {
    Join,
    Progress { chars_typed: u32, errors: u32 },
    Heartbeat,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("the first frame must be 'join'")]
    NotJoined,

    #[error("session already joined")]
    AlreadyJoined,

    #[error("session is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    Alive,
    Late { missed: u32 },
    Lost { missed: u32 },
}

#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    participant_id: ParticipantId,
    state: SessionState,
    last_heartbeat_at: Timestamp,
    heartbeat_interval_millis: i64,
    max_missed_heartbeats: u32,
}

impl Session {
    pub fn new(participant_id: ParticipantId, settings: &SessionSettings, now: Timestamp) -> Self {
        Self {
            id: SessionId::generate(),
            participant_id,
            state: SessionState::Connecting,
            last_heartbeat_at: now,
            heartbeat_interval_millis: i64::try_from(settings.heartbeat_interval.as_millis())
                .unwrap_or(i64::MAX)
                .max(1),
            max_missed_heartbeats: settings.max_missed_heartbeats.max(1),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_heartbeat_at(&self) -> Timestamp {
        self.last_heartbeat_at
    }

    /// The room accepted the join; the link is live.
    pub fn attach(&mut self, now: Timestamp) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Open;
            self.last_heartbeat_at = now;
        }
    }

    /// Returns `true` the first time the session is closed.
    pub fn detach(&mut self) -> bool {
        let was_open = self.state != SessionState::Closed;
        self.state = SessionState::Closed;
        was_open
    }

    /// Decode and validate one text frame.
    ///
    /// Any well-formed frame counts as a sign of life.
    pub fn on_message(&mut self, raw: &str, now: Timestamp) -> Result<InboundEvent, SessionError> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed);
        }
        let message: ClientMessage =
            serde_json::from_str(raw).map_err(|e| SessionError::Malformed(e.to_string()))?;

        self.last_heartbeat_at = now;
        if self.state == SessionState::Reconnecting {
            self.state = SessionState::Open;
        }

        match (self.state, message) {
            (SessionState::Connecting, ClientMessage::Join) => Ok(InboundEvent::Join),
            (SessionState::Connecting, _) => Err(SessionError::NotJoined),
            (_, ClientMessage::Join) => Err(SessionError::AlreadyJoined),
            (_, ClientMessage::Progress {
                chars_typed,
                errors,
            }) => Ok(InboundEvent::Progress {
                chars_typed,
                errors,
            }),
            (_, ClientMessage::Heartbeat) => Ok(InboundEvent::Heartbeat),
            (_, ClientMessage::Start) => Ok(InboundEvent::Start),
        }
    }

    /// Evaluate liveness at `now`; closes the session once too many
    /// heartbeats in a row were missed.
    pub fn check_heartbeat(&mut self, now: Timestamp) -> HeartbeatStatus {
        if self.state == SessionState::Closed {
            return HeartbeatStatus::Lost {
                missed: self.max_missed_heartbeats,
            };
        }
        let silent = now.millis_since(self.last_heartbeat_at).max(0);
        let missed = u32::try_from(silent / self.heartbeat_interval_millis).unwrap_or(u32::MAX);

        if missed >= self.max_missed_heartbeats {
            self.state = SessionState::Closed;
            HeartbeatStatus::Lost { missed }
        } else if missed > 0 {
            if self.state == SessionState::Open {
                self.state = SessionState::Reconnecting;
            }
            HeartbeatStatus::Late { missed }
        } else {
            HeartbeatStatus::Alive
        }
    }
}
