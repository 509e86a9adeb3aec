//! Participant entity.

use crate::domain::value_object::{DisplayName, ParticipantId, SessionId, Timestamp};

/// Latest accepted typing progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub chars_typed: u32,
    pub errors: u32,
    pub updated_at: Timestamp,
}

/// One racer, owned exclusively by its Room.
///
/// `session` is `None` while the participant is disconnected but not
/// evicted; the progress survives so a reconnect can pick up where it left.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: DisplayName,
    pub session: Option<SessionId>,
    pub progress: Progress,
    pub finished_at: Option<Timestamp>,
    pub final_rank: Option<u32>,
    pub joined_at: Timestamp,
    /// Registration order within the room (0 = first joiner)
    pub registration: u64,
}

impl Participant {
    pub fn new(
        id: ParticipantId,
        display_name: DisplayName,
        session: SessionId,
        joined_at: Timestamp,
        registration: u64,
    ) -> Self {
        Self {
            id,
            display_name,
            session: Some(session),
            progress: Progress {
                chars_typed: 0,
                errors: 0,
                updated_at: joined_at,
            },
            finished_at: None,
            final_rank: None,
            joined_at,
            registration,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}
