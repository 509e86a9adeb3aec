//! 値オブジェクト
//!
//! 外部から受け取る文字列はここで一度だけ検証し、以降のレイヤーでは
//! 検証済みの型として扱います。

use std::fmt;

use uuid::Uuid;

use super::error::ValueObjectError;

const MAX_ID_LEN: usize = 64;
const MAX_DISPLAY_NAME_LEN: usize = 32;

fn validate_identifier(field: &'static str, value: &str) -> Result<(), ValueObjectError> {
    if value.is_empty() {
        return Err(ValueObjectError::Empty { field });
    }
    if value.chars().count() > MAX_ID_LEN {
        return Err(ValueObjectError::TooLong {
            field,
            max: MAX_ID_LEN,
        });
    }
    if let Some(ch) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ValueObjectError::InvalidCharacter { field, ch });
    }
    Ok(())
}

/// Race identifier (opaque, externally assigned, routing key of the Room Manager)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RaceId(String);

impl RaceId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_identifier("race_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RaceId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Participant identifier supplied by the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        validate_identifier("participant_id", &value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 表示名（前後の空白は除去、1〜32 文字）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::Empty {
                field: "display_name",
            });
        }
        if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(ValueObjectError::TooLong {
                field: "display_name",
                max: MAX_DISPLAY_NAME_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Identifier of one transport connection.
///
/// A participant keeps its id across reconnects; every new connection gets a
/// fresh `SessionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in milliseconds (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Milliseconds elapsed from `earlier` to `self` (negative if `earlier` is later)
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// The text participants have to type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    text: String,
    len: u32,
}

impl Prompt {
    pub fn new(text: String) -> Result<Self, ValueObjectError> {
        if text.is_empty() {
            return Err(ValueObjectError::Empty { field: "prompt" });
        }
        let len = u32::try_from(text.chars().count()).map_err(|_| ValueObjectError::TooLong {
            field: "prompt",
            max: u32::MAX as usize,
        })?;
        Ok(Self { text, len })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_id_accepts_url_safe_identifier() {
        // テスト項目: URL セーフな文字だけで構成された ID は受理される
        // given (前提条件):
        let raw = "race_2024-abc".to_string();

        // when (操作):
        let result = RaceId::new(raw);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "race_2024-abc");
    }

    #[test]
    fn test_race_id_rejects_empty_and_invalid_characters() {
        // テスト項目: 空文字列とパス区切り文字を含む ID は拒否される
        // given (前提条件):
        let empty = String::new();
        let slashed = "a/b".to_string();

        // when (操作):
        let empty_result = RaceId::new(empty);
        let slashed_result = RaceId::new(slashed);

        // then (期待する結果):
        assert_eq!(
            empty_result,
            Err(ValueObjectError::Empty { field: "race_id" })
        );
        assert_eq!(
            slashed_result,
            Err(ValueObjectError::InvalidCharacter {
                field: "race_id",
                ch: '/'
            })
        );
    }

    #[test]
    fn test_participant_id_rejects_too_long_value() {
        // テスト項目: 64 文字を超える参加者 ID は拒否される
        // given (前提条件):
        let raw = "a".repeat(65);

        // when (操作):
        let result = ParticipantId::new(raw);

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ValueObjectError::TooLong {
                field: "participant_id",
                max: 64
            })
        );
    }

    #[test]
    fn test_display_name_is_trimmed() {
        // テスト項目: 表示名の前後の空白が除去される
        // given (前提条件):
        let raw = "  Alice  ".to_string();

        // when (操作):
        let name = DisplayName::new(raw).unwrap();

        // then (期待する結果):
        assert_eq!(name.as_str(), "Alice");
        assert!(DisplayName::new("   ".to_string()).is_err());
    }

    #[test]
    fn test_prompt_length_counts_characters() {
        // テスト項目: プロンプト長はバイト数ではなく文字数で数えられる
        // given (前提条件):
        let text = "héllo wörld".to_string();

        // when (操作):
        let prompt = Prompt::new(text).unwrap();

        // then (期待する結果):
        assert_eq!(prompt.len(), 11);
    }

    #[test]
    fn test_timestamp_arithmetic() {
        // テスト項目: Timestamp の加算と差分が正しく計算される
        // given (前提条件):
        let start = Timestamp::new(1_000);

        // when (操作):
        let later = start.plus_millis(2_500);

        // then (期待する結果):
        assert_eq!(later.value(), 3_500);
        assert_eq!(later.millis_since(start), 2_500);
        assert_eq!(start.millis_since(later), -2_500);
    }
}
