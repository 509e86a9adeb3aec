//! Messages accepted by a room actor.

use tokio::sync::oneshot;

use crate::domain::{
    ForceStartError, Identity, Participant, ParticipantId, Prompt, PusherChannel, RaceError,
    RaceId, RaceResult, RaceState, ReportStatus, SessionId, Timestamp,
};

/// Reply to a successful join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinAccepted {
    pub reattached: bool,
    pub state: RaceState,
}

/// Point-in-time copy of a room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub race_id: RaceId,
    pub state: RaceState,
    pub prompt: Prompt,
    /// Registration order
    pub participants: Vec<Participant>,
    pub starts_at: Option<Timestamp>,
    pub result: Option<RaceResult>,
    pub report_status: ReportStatus,
    pub evictable: bool,
}

impl RoomSnapshot {
    pub fn participant(&self, participant_id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == participant_id)
    }
}

#[derive(Debug)]
pub enum RoomCommand {
    Join {
        identity: Identity,
        session: SessionId,
        channel: PusherChannel,
        reply: oneshot::Sender<Result<JoinAccepted, RaceError>>,
    },
    Progress {
        participant_id: ParticipantId,
        session: SessionId,
        chars_typed: u32,
        errors: u32,
    },
    Detach {
        participant_id: ParticipantId,
        session: SessionId,
    },
    ForceStart {
        participant_id: ParticipantId,
        reply: oneshot::Sender<Result<(), ForceStartError>>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    /// Close the room if nobody is in it and no result is owed
    Evict {
        reply: oneshot::Sender<bool>,
    },
}
