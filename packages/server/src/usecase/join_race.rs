//! UseCase: レースへの参加（再接続を含む）
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - JoinRaceUseCase::authenticate() / execute()
//!
//! ### なぜこのテストが必要か
//! - 本人確認に失敗した接続が Room に届かないことを保証する
//! - 同じ参加者 ID での再接続が新規参加ではなく再アタッチになることを保証する
//! - 閉じかけの Room に当たった参加要求が新しい Room に回されることを確認する
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規参加、再接続
//! - 異常系：本人確認の失敗、定員超過、終了済みレース

use std::sync::Arc;

use crate::{
    domain::{Credentials, Identity, IdentityProvider, PusherChannel, RaceError, RaceId, SessionId},
    room::{JoinAccepted, RoomHandle, RoomManager},
};

use super::error::JoinRaceError;

/// A session that made it into a room
#[derive(Debug)]
pub struct JoinedRace {
    pub handle: RoomHandle,
    pub accepted: JoinAccepted,
}

/// レース参加のユースケース
pub struct JoinRaceUseCase {
    manager: Arc<RoomManager>,
    identity_provider: Arc<dyn IdentityProvider>,
}

impl JoinRaceUseCase {
    pub fn new(manager: Arc<RoomManager>, identity_provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            manager,
            identity_provider,
        }
    }

    /// 接続要求の資格情報から参加者を特定する
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Identity, JoinRaceError> {
        Ok(self.identity_provider.resolve(credentials).await?)
    }

    /// 参加者のセッションを Room にアタッチする
    ///
    /// # Arguments
    ///
    /// * `race_id` - 参加先のレース
    /// * `identity` - 認証済みの参加者
    /// * `session` - この接続のセッション ID
    /// * `channel` - この接続へのフレーム送信チャンネル
    pub async fn execute(
        &self,
        race_id: RaceId,
        identity: Identity,
        session: SessionId,
        channel: PusherChannel,
    ) -> Result<JoinedRace, JoinRaceError> {
        let handle = self.manager.get_or_create_room(&race_id)?;
        match handle.join(identity.clone(), session, channel.clone()).await {
            Ok(accepted) => Ok(JoinedRace { handle, accepted }),
            Err(RaceError::RaceNotFound(_)) if !self.manager.is_tombstoned(&race_id) => {
                // the room closed between lookup and join without completing a race
                tracing::debug!("Race '{}' closed during join, retrying once", race_id);
                handle.closed().await;
                let handle = self.manager.get_or_create_room(&race_id)?;
                let accepted = handle.join(identity, session, channel).await?;
                Ok(JoinedRace { handle, accepted })
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        domain::{DisplayName, IdentityError, ParticipantId, Prompt, RaceState, RoomSettings, identity::MockIdentityProvider},
        infrastructure::{
            identity::QueryIdentityProvider, prompt::StaticPromptSource,
            reporter::InMemoryLeaderboardReporter,
        },
    };

    fn create_manager(max_participants: usize) -> Arc<RoomManager> {
        RoomManager::new(
            RoomSettings {
                max_participants,
                min_participants: 2,
                countdown: Duration::from_secs(3),
                ..RoomSettings::default()
            },
            Duration::from_secs(600),
            Arc::new(InMemoryLeaderboardReporter::new()),
            Arc::new(StaticPromptSource::new(
                Prompt::new("abc".to_string()).unwrap(),
            )),
        )
    }

    fn identity(id: &str) -> Identity {
        Identity {
            participant_id: ParticipantId::new(id.to_string()).unwrap(),
            display_name: DisplayName::new(id.to_string()).unwrap(),
        }
    }

    fn race(id: &str) -> RaceId {
        RaceId::new(id.to_string()).unwrap()
    }

    async fn join(
        usecase: &JoinRaceUseCase,
        race_id: &str,
        id: &str,
    ) -> Result<JoinedRace, JoinRaceError> {
        let (tx, _rx) = mpsc::unbounded_channel();
        usecase
            .execute(race(race_id), identity(id), SessionId::generate(), tx)
            .await
    }

    #[tokio::test]
    async fn test_authenticate_propagates_identity_error() {
        // テスト項目: 本人確認の失敗は JoinRaceError::Identity になる
        // given (前提条件):
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_resolve()
            .times(1)
            .returning(|_| Err(IdentityError::Missing));
        let usecase = JoinRaceUseCase::new(create_manager(2), Arc::new(provider));

        // when (操作):
        let result = usecase.authenticate(&Credentials::default()).await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), JoinRaceError::Identity(IdentityError::Missing));
    }

    #[tokio::test]
    async fn test_join_then_third_joiner_is_refused() {
        // テスト項目: 定員 2 の Room に 3 人目が参加すると RaceFull
        // given (前提条件):
        let usecase = JoinRaceUseCase::new(create_manager(2), Arc::new(QueryIdentityProvider::new()));

        // when (操作):
        let first = join(&usecase, "race-1", "alice").await.unwrap();
        let second = join(&usecase, "race-1", "bob").await.unwrap();
        let third = join(&usecase, "race-1", "charlie").await;

        // then (期待する結果):
        assert!(!first.accepted.reattached);
        assert_eq!(first.accepted.state, RaceState::Waiting);
        assert_eq!(second.accepted.state, RaceState::Countdown);
        assert_eq!(first.handle.instance(), second.handle.instance());
        assert_eq!(
            third.unwrap_err(),
            JoinRaceError::Race(RaceError::RaceFull { max: 2 })
        );
    }

    #[tokio::test]
    async fn test_rejoin_with_same_identity_reattaches() {
        // テスト項目: 同じ参加者 ID での再参加は再アタッチとして扱われる
        // given (前提条件):
        let usecase = JoinRaceUseCase::new(create_manager(2), Arc::new(QueryIdentityProvider::new()));
        join(&usecase, "race-1", "alice").await.unwrap();

        // when (操作):
        let again = join(&usecase, "race-1", "alice").await.unwrap();

        // then (期待する結果):
        assert!(again.accepted.reattached);
        let snapshot = again.handle.snapshot().await.unwrap();
        assert_eq!(snapshot.participants.len(), 1);
    }

    #[tokio::test]
    async fn test_join_after_eviction_gets_a_fresh_room() {
        // テスト項目: 退去済みの Room のハンドルに当たっても新しい Room に参加できる
        // given (前提条件):
        let manager = create_manager(2);
        let usecase = JoinRaceUseCase::new(manager.clone(), Arc::new(QueryIdentityProvider::new()));
        let stale = manager.get_or_create_room(&race("race-1")).unwrap();
        assert!(manager.remove_room(&race("race-1")).await);
        stale.closed().await;

        // when (操作):
        let joined = join(&usecase, "race-1", "alice").await.unwrap();

        // then (期待する結果):
        assert_ne!(joined.handle.instance(), stale.instance());
        assert_eq!(joined.accepted.state, RaceState::Waiting);
    }
}
