//! Cheap, cloneable address of a room actor.

use tokio::sync::{mpsc, oneshot};

use crate::domain::{
    ForceStartError, Identity, ParticipantId, PusherChannel, RaceError, RaceId, SessionId,
};

use super::command::{JoinAccepted, RoomCommand, RoomSnapshot};

#[derive(Debug, Clone)]
pub struct RoomHandle {
    race_id: RaceId,
    /// Distinguishes successive rooms created under the same race id
    instance: u64,
    tx: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub(crate) fn new(race_id: RaceId, instance: u64, tx: mpsc::UnboundedSender<RoomCommand>) -> Self {
        Self {
            race_id,
            instance,
            tx,
        }
    }

    pub fn race_id(&self) -> &RaceId {
        &self.race_id
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    fn not_found(&self) -> RaceError {
        RaceError::RaceNotFound(self.race_id.as_str().to_string())
    }

    /// Attach a session. A room that has already stopped answers `RaceNotFound`.
    pub async fn join(
        &self,
        identity: Identity,
        session: SessionId,
        channel: PusherChannel,
    ) -> Result<JoinAccepted, RaceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::Join {
                identity,
                session,
                channel,
                reply,
            })
            .map_err(|_| self.not_found())?;
        rx.await.map_err(|_| self.not_found())?
    }

    /// Fire-and-forget; returns `false` once the room has stopped.
    pub fn report_progress(
        &self,
        participant_id: ParticipantId,
        session: SessionId,
        chars_typed: u32,
        errors: u32,
    ) -> bool {
        self.tx
            .send(RoomCommand::Progress {
                participant_id,
                session,
                chars_typed,
                errors,
            })
            .is_ok()
    }

    pub fn detach(&self, participant_id: ParticipantId, session: SessionId) -> bool {
        self.tx
            .send(RoomCommand::Detach {
                participant_id,
                session,
            })
            .is_ok()
    }

    pub async fn force_start(&self, participant_id: ParticipantId) -> Result<(), ForceStartError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::ForceStart {
                participant_id,
                reply,
            })
            .map_err(|_| ForceStartError::NotWaiting)?;
        rx.await.map_err(|_| ForceStartError::NotWaiting)?
    }

    /// `None` once the room has stopped
    pub async fn snapshot(&self) -> Option<RoomSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(RoomCommand::Snapshot { reply }).ok()?;
        rx.await.ok()
    }

    /// Ask the room to close if it is empty and owes no result.
    ///
    /// A room that has already stopped counts as evicted.
    pub async fn evict(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(RoomCommand::Evict { reply }).is_err() {
            return true;
        }
        rx.await.unwrap_or(true)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the actor has stopped
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}
