//! In-process leaderboard.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{LeaderboardReporter, RaceId, RaceResult, ReportAck, ReportError};

/// Keeps one result per race id.
///
/// A second report for the same race id is acknowledged as a duplicate and
/// leaves the stored result untouched.
#[derive(Debug, Default)]
pub struct InMemoryLeaderboardReporter {
    results: Mutex<HashMap<RaceId, RaceResult>>,
}

impl InMemoryLeaderboardReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn result_of(&self, race_id: &RaceId) -> Option<RaceResult> {
        self.results.lock().await.get(race_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.results.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.results.lock().await.is_empty()
    }
}

#[async_trait]
impl LeaderboardReporter for InMemoryLeaderboardReporter {
    async fn report_race_result(&self, result: &RaceResult) -> Result<ReportAck, ReportError> {
        let mut results = self.results.lock().await;
        if results.contains_key(result.race_id()) {
            tracing::debug!("Result for race '{}' already recorded", result.race_id());
            return Ok(ReportAck { duplicate: true });
        }
        results.insert(result.race_id().clone(), result.clone());
        tracing::info!(
            "Recorded result for race '{}' ({} standings)",
            result.race_id(),
            result.standings().len()
        );
        Ok(ReportAck { duplicate: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;

    fn result(race_id: &str, finished_at: i64) -> RaceResult {
        RaceResult::new(
            RaceId::new(race_id.to_string()).unwrap(),
            Timestamp::new(finished_at),
            Vec::new(),
        )
    }

    #[tokio::test]
    async fn test_repeated_report_is_not_inserted_twice() {
        // テスト項目: 同じ race id の再送は重複として扱われ、二重登録されない
        // given (前提条件):
        let reporter = InMemoryLeaderboardReporter::new();
        let first = result("race-1", 1_000);
        let retried = result("race-1", 2_000);

        // when (操作):
        let first_ack = reporter.report_race_result(&first).await.unwrap();
        let retry_ack = reporter.report_race_result(&retried).await.unwrap();

        // then (期待する結果):
        assert!(!first_ack.duplicate);
        assert!(retry_ack.duplicate);
        assert_eq!(reporter.len().await, 1);
        let stored = reporter.result_of(first.race_id()).await.unwrap();
        assert_eq!(stored.finished_at(), Timestamp::new(1_000));
    }
}
