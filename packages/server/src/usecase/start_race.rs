//! UseCase: ホストによる強制スタート

use crate::{
    domain::{ForceStartError, ParticipantId},
    room::RoomHandle,
};

/// 強制スタートのユースケース
#[derive(Debug, Default)]
pub struct StartRaceUseCase;

impl StartRaceUseCase {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        room: &RoomHandle,
        requester: ParticipantId,
    ) -> Result<(), ForceStartError> {
        room.force_start(requester).await
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        domain::{DisplayName, Identity, Prompt, RaceId, RaceState, RoomSettings, SessionId},
        infrastructure::{prompt::StaticPromptSource, reporter::InMemoryLeaderboardReporter},
        room::{RoomHandle, RoomManager},
    };

    async fn room_with(ids: &[&str]) -> RoomHandle {
        let manager = RoomManager::new(
            RoomSettings {
                min_participants: 4,
                ..RoomSettings::default()
            },
            Duration::from_secs(600),
            Arc::new(InMemoryLeaderboardReporter::new()),
            Arc::new(StaticPromptSource::new(Prompt::new("go".to_string()).unwrap())),
        );
        let room = manager
            .get_or_create_room(&RaceId::new("race-1".to_string()).unwrap())
            .unwrap();
        for id in ids {
            let (tx, _rx) = mpsc::unbounded_channel();
            room.join(
                Identity {
                    participant_id: ParticipantId::new(id.to_string()).unwrap(),
                    display_name: DisplayName::new(id.to_string()).unwrap(),
                },
                SessionId::generate(),
                tx,
            )
            .await
            .unwrap();
        }
        room
    }

    #[tokio::test]
    async fn test_host_can_force_start() {
        // テスト項目: 最初に参加したホストは人数が揃う前でもカウントダウンを開始できる
        // given (前提条件):
        let room = room_with(&["alice", "bob"]).await;
        let usecase = StartRaceUseCase::new();

        // when (操作):
        let by_guest = usecase
            .execute(&room, ParticipantId::new("bob".to_string()).unwrap())
            .await;
        let by_host = usecase
            .execute(&room, ParticipantId::new("alice".to_string()).unwrap())
            .await;

        // then (期待する結果):
        assert_eq!(by_guest, Err(ForceStartError::NotHost));
        assert_eq!(by_host, Ok(()));
        assert_eq!(room.snapshot().await.unwrap().state, RaceState::Countdown);
    }
}
