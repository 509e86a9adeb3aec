//! Prompt selection.

use super::value_object::{Prompt, RaceId};

/// Chooses the text a race will be typed against.
///
/// The choice must be stable for a race id so every participant, and every
/// re-created room under the same id, sees the same prompt.
#[cfg_attr(test, mockall::automock)]
pub trait PromptSource: Send + Sync {
    fn prompt_for(&self, race_id: &RaceId) -> Prompt;
}
