//! Domain error types.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} contains invalid character '{ch}'")]
    InvalidCharacter { field: &'static str, ch: char },
}

/// Structural race errors.
///
/// These are terminal for the requesting connection and are surfaced to the
/// client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaceError {
    #[error("race '{0}' not found")]
    RaceNotFound(String),

    #[error("race is full ({max} participants)")]
    RaceFull { max: usize },

    #[error("race has already started")]
    RaceAlreadyStarted,
}

/// Reasons a progress update was not applied.
///
/// Progress is corrected in place: the participant keeps its last valid
/// value and the connection stays open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidProgress {
    #[error("race is not running")]
    NotRacing,

    #[error("participant is not part of this race")]
    UnknownParticipant,

    #[error("update came from a superseded session")]
    StaleSession,

    #[error("participant has already finished")]
    AlreadyFinished,

    #[error("chars_typed regressed from {last} to {reported}")]
    Regressed { last: u32, reported: u32 },

    #[error("chars_typed {reported} exceeds prompt length {prompt_len}")]
    ExceedsPrompt { prompt_len: u32, reported: u32 },
}

/// Reasons a force-start request was ignored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForceStartError {
    #[error("only the host can start the race")]
    NotHost,

    #[error("race is not waiting for participants")]
    NotWaiting,
}

/// Leaderboard collaborator failures (all retryable)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    #[error("leaderboard unavailable: {0}")]
    Unavailable(String),

    #[error("leaderboard rejected the result (status {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Identity collaborator failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("no participant identity supplied")]
    Missing,

    #[error("invalid identity: {0}")]
    Invalid(#[from] ValueObjectError),
}
