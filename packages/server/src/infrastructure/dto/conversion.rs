//! Conversion logic from domain entities to DTOs.

use crate::domain::{
    Participant, ParticipantId, RaceError, RaceResult, RaceState, Room, RoomEvent, Standing,
};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<RaceState> for dto::RaceStateKind {
    fn from(state: RaceState) -> Self {
        match state {
            RaceState::Waiting => Self::Waiting,
            RaceState::Countdown => Self::Countdown,
            RaceState::Racing => Self::Racing,
            RaceState::Finished => Self::Finished,
            RaceState::Closed => Self::Closed,
        }
    }
}

impl From<&Participant> for dto::ParticipantInfo {
    fn from(model: &Participant) -> Self {
        Self {
            participant_id: model.id.as_str().to_string(),
            display_name: model.display_name.as_str().to_string(),
            chars_typed: model.progress.chars_typed,
            errors: model.progress.errors,
            connected: model.is_connected(),
            finished: model.is_finished(),
            rank: model.final_rank,
        }
    }
}

impl From<&Standing> for dto::StandingInfo {
    fn from(model: &Standing) -> Self {
        Self {
            participant_id: model.participant_id.as_str().to_string(),
            display_name: model.display_name.as_str().to_string(),
            wpm: model.wpm,
            accuracy: model.accuracy,
            finish_position: model.finish_position,
            dnf: model.dnf,
            chars_typed: model.chars_typed,
            errors: model.errors,
        }
    }
}

impl From<&RaceResult> for dto::RaceResultMessage {
    fn from(model: &RaceResult) -> Self {
        Self {
            race_id: model.race_id().as_str().to_string(),
            finished_at: model.finished_at().value(),
            standings: model.standings().iter().map(Into::into).collect(),
        }
    }
}

impl From<&RaceError> for dto::ErrorKind {
    fn from(error: &RaceError) -> Self {
        match error {
            RaceError::RaceNotFound(_) => Self::RaceNotFound,
            RaceError::RaceFull { .. } => Self::RaceFull,
            RaceError::RaceAlreadyStarted => Self::RaceStarted,
        }
    }
}

impl From<&RaceError> for dto::ServerMessage {
    fn from(error: &RaceError) -> Self {
        dto::ServerMessage::error(error.into(), error.to_string())
    }
}

/// Snapshot of `room` as seen by `recipient`
pub fn state_message(room: &Room, recipient: &ParticipantId) -> dto::RaceStateMessage {
    dto::RaceStateMessage {
        race_id: room.id().as_str().to_string(),
        state: room.state().into(),
        prompt: room.prompt().text().to_string(),
        participants: room
            .participants_in_order()
            .into_iter()
            .map(Into::into)
            .collect(),
        starts_at: room.starts_at().map(|t| t.value()),
        countdown_deadline: room.countdown_deadline().map(|t| t.value()),
        you: recipient.as_str().to_string(),
    }
}

/// Render a room event into the frame sent to `recipient`
pub fn render_event(room: &Room, event: &RoomEvent, recipient: &ParticipantId) -> dto::ServerMessage {
    match event {
        RoomEvent::StateChanged => dto::ServerMessage::State(state_message(room, recipient)),
        RoomEvent::CountdownTick { remaining_secs } => dto::ServerMessage::CountdownTick {
            remaining_secs: *remaining_secs,
        },
        RoomEvent::Progress {
            participant_id,
            chars_typed,
            errors,
            finished,
            rank,
        } => dto::ServerMessage::ProgressBroadcast(dto::ProgressBroadcast {
            participant_id: participant_id.as_str().to_string(),
            chars_typed: *chars_typed,
            errors: *errors,
            finished: *finished,
            rank: *rank,
        }),
        RoomEvent::Finished(result) => dto::ServerMessage::Finished(result.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DisplayName, Prompt, RaceId, RoomSettings, SessionId, Timestamp};

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id.to_string()).unwrap()
    }

    fn create_room() -> Room {
        Room::new(
            RaceId::new("race-7".to_string()).unwrap(),
            Prompt::new("hello world".to_string()).unwrap(),
            RoomSettings::default(),
            Timestamp::new(1_000),
        )
    }

    #[test]
    fn test_state_message_is_rendered_for_recipient() {
        // テスト項目: スナップショットは受信者ごとに you を持ち、参加者は登録順に並ぶ
        // given (前提条件):
        let mut room = create_room();
        for id in ["zed", "amy"] {
            room.join(
                pid(id),
                DisplayName::new(id.to_uppercase()).unwrap(),
                SessionId::generate(),
                Timestamp::new(1_000),
            )
            .unwrap();
        }

        // when (操作):
        let message = state_message(&room, &pid("amy"));

        // then (期待する結果):
        assert_eq!(message.you, "amy");
        assert_eq!(message.prompt, "hello world");
        assert_eq!(message.state, dto::RaceStateKind::Countdown);
        let order: Vec<&str> = message
            .participants
            .iter()
            .map(|p| p.participant_id.as_str())
            .collect();
        assert_eq!(order, vec!["zed", "amy"]);
        assert_eq!(message.participants[0].display_name, "ZED");
        assert!(message.countdown_deadline.is_some());
        assert_eq!(message.starts_at, None);
    }

    #[test]
    fn test_race_errors_map_to_wire_kinds() {
        // テスト項目: 構造的エラーはワイヤ上の ErrorKind に 1:1 で対応する
        assert_eq!(
            dto::ErrorKind::from(&RaceError::RaceNotFound("x".to_string())),
            dto::ErrorKind::RaceNotFound
        );
        assert_eq!(
            dto::ErrorKind::from(&RaceError::RaceFull { max: 2 }),
            dto::ErrorKind::RaceFull
        );
        assert_eq!(
            dto::ErrorKind::from(&RaceError::RaceAlreadyStarted),
            dto::ErrorKind::RaceStarted
        );
    }

    #[test]
    fn test_progress_event_renders_broadcast() {
        // テスト項目: 進捗イベントは progress_broadcast として描画される
        // given (前提条件):
        let room = create_room();
        let event = RoomEvent::Progress {
            participant_id: pid("amy"),
            chars_typed: 4,
            errors: 1,
            finished: false,
            rank: None,
        };

        // when (操作):
        let message = render_event(&room, &event, &pid("zed"));

        // then (期待する結果):
        assert_eq!(
            message,
            dto::ServerMessage::ProgressBroadcast(dto::ProgressBroadcast {
                participant_id: "amy".to_string(),
                chars_typed: 4,
                errors: 1,
                finished: false,
                rank: None,
            })
        );
    }
}
