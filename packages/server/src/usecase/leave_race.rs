//! UseCase: セッションの切断

use crate::{
    domain::{ParticipantId, SessionId},
    room::RoomHandle,
};

/// セッション切断のユースケース
///
/// Room には「このセッションのリンクを外す」ことだけを伝えます。
/// 参加者を名簿から外すかどうかは Room の状態次第です。
#[derive(Debug, Default)]
pub struct LeaveRaceUseCase;

impl LeaveRaceUseCase {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, room: &RoomHandle, participant_id: ParticipantId, session: SessionId) {
        tracing::debug!(
            "Session {} of '{}' leaving race '{}'",
            session,
            participant_id,
            room.race_id()
        );
        room.detach(participant_id, session);
    }
}
