//! Message formatting utilities for client display.

use std::time::Duration;

use keyrace_server::infrastructure::dto::websocket::{
    ErrorKind, ProgressBroadcast, RaceResultMessage, RaceStateKind, RaceStateMessage,
};
use keyrace_shared::time::timestamp_to_rfc3339;

const RULE: &str = "============================================================";

/// Message formatter for client display
pub struct RaceFormatter;

impl RaceFormatter {
    /// Format a full room snapshot
    ///
    /// # Arguments
    ///
    /// * `state` - The snapshot received from the server
    /// * `now_millis` - Current time, used for the countdown remainder
    pub fn format_state(state: &RaceStateMessage, now_millis: i64) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n{}\n", RULE));
        output.push_str(&format!(
            "Race {} - {}\n",
            state.race_id,
            Self::state_label(state.state)
        ));

        if let Some(deadline) = state.countdown_deadline
            && state.state == RaceStateKind::Countdown
        {
            let remaining = (deadline - now_millis).max(0) as f64 / 1000.0;
            output.push_str(&format!("Starts in {:.1}s\n", remaining));
        }
        if let Some(starts_at) = state.starts_at {
            output.push_str(&format!("Start: {}\n", timestamp_to_rfc3339(starts_at)));
        }

        let prompt_len = state.prompt.chars().count() as u32;
        for p in &state.participants {
            let me = if p.participant_id == state.you { " (me)" } else { "" };
            let link = if p.connected { "" } else { " [offline]" };
            let rank = p.rank.map(|r| format!(" #{}", r)).unwrap_or_default();
            output.push_str(&format!(
                "{}{}{} {}/{}{}\n",
                p.display_name, me, link, p.chars_typed, prompt_len, rank
            ));
        }

        if state.state == RaceStateKind::Racing || state.state == RaceStateKind::Countdown {
            output.push_str(&format!("\nPrompt: {}\n", state.prompt));
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    pub fn format_countdown(remaining_secs: u32) -> String {
        if remaining_secs == 0 {
            "\nGo!\n".to_string()
        } else {
            format!("\n{}...\n", remaining_secs)
        }
    }

    pub fn format_progress(progress: &ProgressBroadcast) -> String {
        match progress.rank {
            Some(rank) if progress.finished => {
                format!("\n> {} finished #{}\n", progress.participant_id, rank)
            }
            _ => format!(
                "\n> {} typed {} ({} errors)\n",
                progress.participant_id, progress.chars_typed, progress.errors
            ),
        }
    }

    /// Format the final standings
    ///
    /// # Arguments
    ///
    /// * `result` - The race result
    /// * `me` - The current participant id (to mark as "me")
    pub fn format_standings(result: &RaceResultMessage, me: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str(&format!(
            "Results of {} ({})\n",
            result.race_id,
            timestamp_to_rfc3339(result.finished_at)
        ));
        for s in &result.standings {
            let position = if s.dnf {
                "DNF".to_string()
            } else {
                format!("{}.", s.finish_position)
            };
            let me_suffix = if s.participant_id == me { " (me)" } else { "" };
            output.push_str(&format!(
                "{:>4} {}{} - {:.2} wpm, {:.2}% accuracy\n",
                position, s.display_name, me_suffix, s.wpm, s.accuracy
            ));
        }
        output.push_str(&format!("{}\n", RULE));
        output
    }

    pub fn format_error(kind: ErrorKind, message: &str) -> String {
        format!("\n! [{}] {}\n", kind.as_str(), message)
    }

    pub fn format_reconnecting(attempt: u32, max_attempts: u32, delay: Duration) -> String {
        format!(
            "\nConnection lost. Reconnecting in {:.1}s (attempt {}/{})\n",
            delay.as_secs_f64(),
            attempt,
            max_attempts
        )
    }

    fn state_label(state: RaceStateKind) -> &'static str {
        match state {
            RaceStateKind::Waiting => "waiting for racers",
            RaceStateKind::Countdown => "countdown",
            RaceStateKind::Racing => "racing",
            RaceStateKind::Finished => "finished",
            RaceStateKind::Closed => "closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use keyrace_server::infrastructure::dto::websocket::{ParticipantInfo, StandingInfo};
    use keyrace_shared::time::{Clock, FixedClock};

    use super::*;

    fn participant(id: &str, chars_typed: u32, connected: bool) -> ParticipantInfo {
        ParticipantInfo {
            participant_id: id.to_string(),
            display_name: id.to_string(),
            chars_typed,
            errors: 0,
            connected,
            finished: false,
            rank: None,
        }
    }

    #[test]
    fn test_format_state_marks_me_and_offline_racers() {
        // テスト項目: 自分には (me)、切断中の参加者には [offline] が付き、進捗が表示される
        // given (前提条件):
        let state = RaceStateMessage {
            race_id: "race-1".to_string(),
            state: RaceStateKind::Racing,
            prompt: "hello".to_string(),
            participants: vec![participant("alice", 2, true), participant("bob", 4, false)],
            starts_at: Some(1672531200000),
            countdown_deadline: None,
            you: "alice".to_string(),
        };

        // when (操作):
        let result = RaceFormatter::format_state(&state, 1672531201000);

        // then (期待する結果):
        assert!(result.contains("Race race-1 - racing"));
        assert!(result.contains("alice (me) 2/5"));
        assert!(result.contains("bob [offline] 4/5"));
        assert!(result.contains("Prompt: hello"));
        assert!(result.contains("2023-01-01"));
    }

    #[test]
    fn test_format_state_shows_countdown_remainder() {
        // テスト項目: カウントダウン中は開始までの残り時間が表示される
        // given (前提条件):
        let clock = FixedClock::new(1672531200000);
        let state = RaceStateMessage {
            race_id: "race-1".to_string(),
            state: RaceStateKind::Countdown,
            prompt: "hello".to_string(),
            participants: vec![participant("alice", 0, true)],
            starts_at: None,
            countdown_deadline: Some(1672531203500),
            you: "alice".to_string(),
        };

        // when (操作):
        let result = RaceFormatter::format_state(&state, clock.now_millis());

        // then (期待する結果):
        assert!(result.contains("Starts in 3.5s"));
    }

    #[test]
    fn test_format_standings_lists_finishers_then_dnf() {
        // テスト項目: 最終順位が順位付きで表示され、未完走者は DNF になる
        // given (前提条件):
        let result = RaceResultMessage {
            race_id: "race-1".to_string(),
            finished_at: 1672531200000,
            standings: vec![
                StandingInfo {
                    participant_id: "alice".to_string(),
                    display_name: "Alice".to_string(),
                    wpm: 72.5,
                    accuracy: 98.0,
                    finish_position: 1,
                    dnf: false,
                    chars_typed: 50,
                    errors: 1,
                },
                StandingInfo {
                    participant_id: "bob".to_string(),
                    display_name: "Bob".to_string(),
                    wpm: 30.0,
                    accuracy: 100.0,
                    finish_position: 2,
                    dnf: true,
                    chars_typed: 20,
                    errors: 0,
                },
            ],
        };

        // when (操作):
        let output = RaceFormatter::format_standings(&result, "bob");

        // then (期待する結果):
        assert!(output.contains("1. Alice - 72.50 wpm, 98.00% accuracy"));
        assert!(output.contains("DNF Bob (me)"));
        assert!(output.contains("Results of race-1"));
    }

    #[test]
    fn test_format_progress_for_finisher() {
        // テスト項目: 完走した参加者の進捗は順位付きで表示される
        // given (前提条件):
        let progress = ProgressBroadcast {
            participant_id: "bob".to_string(),
            chars_typed: 5,
            errors: 0,
            finished: true,
            rank: Some(2),
        };

        // when (操作):
        let result = RaceFormatter::format_progress(&progress);

        // then (期待する結果):
        assert!(result.contains("bob finished #2"));
    }

    #[test]
    fn test_format_error_and_reconnecting() {
        // テスト項目: エラーと再接続の通知に種別と試行回数が含まれる
        // given (前提条件):
        let delay = Duration::from_millis(1500);

        // when (操作):
        let error = RaceFormatter::format_error(ErrorKind::RaceFull, "race is full");
        let reconnecting = RaceFormatter::format_reconnecting(2, 5, delay);

        // then (期待する結果):
        assert!(error.contains("[race_full] race is full"));
        assert!(reconnecting.contains("1.5s"));
        assert!(reconnecting.contains("attempt 2/5"));
    }
}
