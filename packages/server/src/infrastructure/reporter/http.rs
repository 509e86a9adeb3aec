//! Leaderboard reporter backed by an HTTP service.
//!
//! `POST {base_url}/races/{race_id}/result` with the result as JSON and an
//! `Idempotency-Key` header carrying the race id. `409 Conflict` is read as
//! "already recorded".

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{
    domain::{LeaderboardReporter, RaceResult, ReportAck, ReportError},
    infrastructure::dto::websocket::RaceResultMessage,
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone)]
pub struct HttpLeaderboardReporter {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLeaderboardReporter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ReportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, result: &RaceResult) -> String {
        format!("{}/races/{}/result", self.base_url, result.race_id())
    }
}

#[async_trait]
impl LeaderboardReporter for HttpLeaderboardReporter {
    async fn report_race_result(&self, result: &RaceResult) -> Result<ReportAck, ReportError> {
        let url = self.endpoint(result);
        tracing::debug!("Reporting race result to {}", url);

        let response = self
            .http
            .post(&url)
            .header(IDEMPOTENCY_KEY_HEADER, result.race_id().as_str())
            .json(&RaceResultMessage::from(result))
            .send()
            .await
            .map_err(|e| ReportError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Ok(ReportAck { duplicate: true });
        }
        if !status.is_success() {
            return Err(ReportError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(ReportAck { duplicate: false })
    }
}
