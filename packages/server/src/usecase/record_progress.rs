//! UseCase: 進捗の報告

use crate::{
    domain::{ParticipantId, SessionId},
    room::RoomHandle,
};

/// 進捗報告のユースケース
///
/// 検証と適用は Room アクターが行うため、ここでは単一ライターへ
/// 引き渡すだけです。
#[derive(Debug, Default)]
pub struct RecordProgressUseCase;

impl RecordProgressUseCase {
    pub fn new() -> Self {
        Self
    }

    /// Returns `false` when the room has already stopped.
    pub fn execute(
        &self,
        room: &RoomHandle,
        participant_id: ParticipantId,
        session: SessionId,
        chars_typed: u32,
        errors: u32,
    ) -> bool {
        let delivered = room.report_progress(participant_id.clone(), session, chars_typed, errors);
        if !delivered {
            tracing::debug!(
                "Progress from '{}' dropped: race '{}' has stopped",
                participant_id,
                room.race_id()
            );
        }
        delivered
    }
}
