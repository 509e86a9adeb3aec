//! Shared application state.

use std::sync::Arc;

use crate::{
    config::SessionSettings,
    room::TokioClock,
    usecase::{JoinRaceUseCase, LeaveRaceUseCase, RecordProgressUseCase, StartRaceUseCase},
};

pub struct AppState {
    /// JoinRaceUseCase（本人確認と Room への参加）
    pub join_race_usecase: Arc<JoinRaceUseCase>,
    /// RecordProgressUseCase（進捗の報告）
    pub record_progress_usecase: Arc<RecordProgressUseCase>,
    /// LeaveRaceUseCase（セッションの切断）
    pub leave_race_usecase: Arc<LeaveRaceUseCase>,
    /// StartRaceUseCase（ホストによる強制スタート）
    pub start_race_usecase: Arc<StartRaceUseCase>,
    pub session_settings: SessionSettings,
    pub clock: TokioClock,
}
