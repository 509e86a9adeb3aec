//! Leaderboard collaborator.

use async_trait::async_trait;

use super::{entity::RaceResult, error::ReportError};

/// Acknowledgement from the leaderboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportAck {
    /// The race id was already recorded; nothing new was inserted
    pub duplicate: bool,
}

/// Receives each finished race's result.
///
/// Implementations must be idempotent per race id: retrying a report that
/// already landed acknowledges it again without inserting twice.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaderboardReporter: Send + Sync {
    async fn report_race_result(&self, result: &RaceResult) -> Result<ReportAck, ReportError>;
}
