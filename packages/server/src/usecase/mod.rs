//! UseCase 層
//!
//! UI 層（Connection Gateway / Session）から呼ばれ、Room Manager と
//! Room アクターに処理を委ねます。

mod error;
mod join_race;
mod leave_race;
mod record_progress;
mod start_race;

pub use error::JoinRaceError;
pub use join_race::{JoinRaceUseCase, JoinedRace};
pub use leave_race::LeaveRaceUseCase;
pub use record_progress::RecordProgressUseCase;
pub use start_race::StartRaceUseCase;
