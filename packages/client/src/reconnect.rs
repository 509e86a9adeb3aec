//! 再接続コントローラ
//!
//! 接続の成否と失敗の種別だけを入力に取る純粋な状態機械です。
//! タイマーや I/O は持たず、次に何をすべきかを [`ReconnectAction`] で返します。

use std::time::Duration;

use keyrace_server::infrastructure::dto::websocket::ErrorKind;

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base: Duration,
    max: Duration,
    max_attempts: u32,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max,
            max_attempts,
        }
    }

    /// Delay before reconnection attempt `attempt` (1-based): `base·2^(attempt-1)`, capped at `max`
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(8), 5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    Idle,
    /// `attempt` is 0 for the first connection, then the reconnection attempt number
    Connecting { attempt: u32 },
    Connected,
    Waiting { attempt: u32, delay: Duration },
    /// The race is over or the user quit
    Done,
    /// Gave up; carries the failure that ended the run
    Failed(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAction {
    Connect { attempt: u32 },
    Wait(Duration),
    Stop,
}

#[derive(Debug, Clone)]
pub struct ReconnectController {
    policy: BackoffPolicy,
    state: ReconnectState,
    failures: u32,
}

impl ReconnectController {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            state: ReconnectState::Idle,
            failures: 0,
        }
    }

    pub fn state(&self) -> ReconnectState {
        self.state
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn start(&mut self) -> ReconnectAction {
        match self.state {
            ReconnectState::Idle => {
                self.state = ReconnectState::Connecting { attempt: 0 };
                ReconnectAction::Connect { attempt: 0 }
            }
            _ => self.current_action(),
        }
    }

    /// The room accepted the join; the attempt budget is refilled.
    pub fn on_connected(&mut self) {
        if matches!(self.state, ReconnectState::Connecting { .. }) {
            self.state = ReconnectState::Connected;
            self.failures = 0;
        }
    }

    pub fn on_failure(&mut self, kind: ErrorKind) -> ReconnectAction {
        if matches!(self.state, ReconnectState::Done | ReconnectState::Failed(_)) {
            return ReconnectAction::Stop;
        }
        if !kind.is_retryable() {
            self.state = ReconnectState::Failed(kind);
            return ReconnectAction::Stop;
        }

        self.failures += 1;
        if self.failures > self.policy.max_attempts {
            self.state = ReconnectState::Failed(kind);
            return ReconnectAction::Stop;
        }

        let delay = self.policy.delay(self.failures);
        self.state = ReconnectState::Waiting {
            attempt: self.failures,
            delay,
        };
        ReconnectAction::Wait(delay)
    }

    pub fn on_wait_elapsed(&mut self) -> ReconnectAction {
        if let ReconnectState::Waiting { attempt, .. } = self.state {
            self.state = ReconnectState::Connecting { attempt };
        }
        self.current_action()
    }

    pub fn on_finished(&mut self) {
        self.state = ReconnectState::Done;
    }

    fn current_action(&self) -> ReconnectAction {
        match self.state {
            ReconnectState::Idle | ReconnectState::Done | ReconnectState::Failed(_) => {
                ReconnectAction::Stop
            }
            ReconnectState::Connecting { attempt } => ReconnectAction::Connect { attempt },
            ReconnectState::Connected => ReconnectAction::Stop,
            ReconnectState::Waiting { delay, .. } => ReconnectAction::Wait(delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(500),
            Duration::from_secs(8),
            max_attempts,
        )
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        // テスト項目: 待ち時間は base·2^(n-1) で増え、上限で頭打ちになる
        // given (前提条件):
        let policy = policy(10);

        // when (操作):
        let delays: Vec<u64> = (1..=7).map(|n| policy.delay(n).as_millis() as u64).collect();

        // then (期待する結果):
        assert_eq!(delays, vec![500, 1_000, 2_000, 4_000, 8_000, 8_000, 8_000]);
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn test_retryable_failures_wait_then_reconnect() {
        // テスト項目: 再接続可能な失敗では待機後に同じ試行番号で再接続する
        // given (前提条件):
        let mut controller = ReconnectController::new(policy(3));
        assert_eq!(controller.start(), ReconnectAction::Connect { attempt: 0 });

        // when (操作):
        let first = controller.on_failure(ErrorKind::Network);
        let reconnect = controller.on_wait_elapsed();
        let second = controller.on_failure(ErrorKind::Websocket);

        // then (期待する結果):
        assert_eq!(first, ReconnectAction::Wait(Duration::from_millis(500)));
        assert_eq!(reconnect, ReconnectAction::Connect { attempt: 1 });
        assert_eq!(second, ReconnectAction::Wait(Duration::from_millis(1_000)));
        assert_eq!(
            controller.state(),
            ReconnectState::Waiting {
                attempt: 2,
                delay: Duration::from_millis(1_000)
            }
        );
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        // テスト項目: 設定回数まで再接続しても失敗し続けた場合は諦める
        // given (前提条件):
        let mut controller = ReconnectController::new(policy(2));
        controller.start();

        // when (操作):
        let mut actions = Vec::new();
        for _ in 0..3 {
            actions.push(controller.on_failure(ErrorKind::Network));
            controller.on_wait_elapsed();
        }

        // then (期待する結果):
        assert!(matches!(actions[0], ReconnectAction::Wait(_)));
        assert!(matches!(actions[1], ReconnectAction::Wait(_)));
        assert_eq!(actions[2], ReconnectAction::Stop);
        assert_eq!(controller.state(), ReconnectState::Failed(ErrorKind::Network));
        assert_eq!(controller.on_wait_elapsed(), ReconnectAction::Stop);
    }

    #[test]
    fn test_non_retryable_kind_stops_immediately() {
        // テスト項目: race_not_found などの構造的エラーでは再接続せずに即座に終了する
        // given (前提条件):
        let mut controller = ReconnectController::new(policy(5));
        controller.start();

        // when (操作):
        let action = controller.on_failure(ErrorKind::RaceNotFound);

        // then (期待する結果):
        assert_eq!(action, ReconnectAction::Stop);
        assert_eq!(
            controller.state(),
            ReconnectState::Failed(ErrorKind::RaceNotFound)
        );
    }

    #[test]
    fn test_successful_join_refills_attempts() {
        // テスト項目: 参加に成功すると再接続回数がリセットされ、次の切断でも最初の待ち時間から始まる
        // given (前提条件):
        let mut controller = ReconnectController::new(policy(2));
        controller.start();
        controller.on_failure(ErrorKind::Network);
        controller.on_wait_elapsed();
        controller.on_failure(ErrorKind::Network);
        controller.on_wait_elapsed();

        // when (操作):
        controller.on_connected();
        let action = controller.on_failure(ErrorKind::Websocket);

        // then (期待する結果):
        assert_eq!(action, ReconnectAction::Wait(Duration::from_millis(500)));
    }

    #[test]
    fn test_finished_race_never_reconnects() {
        // テスト項目: レース終了後は失敗が届いても再接続しない
        // given (前提条件):
        let mut controller = ReconnectController::new(policy(5));
        controller.start();
        controller.on_connected();

        // when (操作):
        controller.on_finished();
        let action = controller.on_failure(ErrorKind::Websocket);

        // then (期待する結果):
        assert_eq!(action, ReconnectAction::Stop);
        assert_eq!(controller.state(), ReconnectState::Done);
    }
}
