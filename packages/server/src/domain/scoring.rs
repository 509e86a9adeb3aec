//! Typing speed scoring.

const CHARS_PER_WORD: f64 = 5.0;
const MILLIS_PER_MINUTE: f64 = 60_000.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Words per minute, counting five characters as one word.
///
/// Returns 0 when no time has elapsed.
pub fn words_per_minute(chars_typed: u32, elapsed_millis: i64) -> f64 {
    if elapsed_millis <= 0 {
        return 0.0;
    }
    let words = f64::from(chars_typed) / CHARS_PER_WORD;
    round2(words / (elapsed_millis as f64 / MILLIS_PER_MINUTE))
}

/// Accuracy in percent: correct characters over all keystrokes
pub fn accuracy(chars_typed: u32, errors: u32) -> f64 {
    let total = u64::from(chars_typed) + u64::from(errors);
    if total == 0 {
        return 100.0;
    }
    round2(chars_typed as f64 / total as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_per_minute() {
        // テスト項目: 50 文字を 12 秒で入力すると 50 WPM
        // given (前提条件):
        let chars = 50;
        let elapsed = 12_000;

        // when (操作):
        let wpm = words_per_minute(chars, elapsed);

        // then (期待する結果):
        assert_eq!(wpm, 50.0);
    }

    #[test]
    fn test_words_per_minute_without_elapsed_time() {
        // テスト項目: 経過時間が 0 以下の場合は 0 WPM
        assert_eq!(words_per_minute(10, 0), 0.0);
        assert_eq!(words_per_minute(10, -5), 0.0);
    }

    #[test]
    fn test_accuracy() {
        // テスト項目: 正解文字数とミス数から正確率が計算される
        // given (前提条件):
        let chars = 45;
        let errors = 5;

        // when (操作):
        let result = accuracy(chars, errors);

        // then (期待する結果):
        assert_eq!(result, 90.0);
        assert_eq!(accuracy(0, 0), 100.0);
        assert_eq!(accuracy(2, 1), 66.67);
    }
}
