//! Terminal race result.

use crate::domain::value_object::{DisplayName, ParticipantId, RaceId, Timestamp};

/// One row of the final standings
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub participant_id: ParticipantId,
    pub display_name: DisplayName,
    pub wpm: f64,
    pub accuracy: f64,
    /// 1-based, contiguous across finishers and DNFs
    pub finish_position: u32,
    pub dnf: bool,
    pub chars_typed: u32,
    pub errors: u32,
}

/// Final outcome of a race.
///
/// Built once when the room finishes and never mutated afterwards; handed to
/// the leaderboard collaborator and broadcast to every session.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceResult {
    race_id: RaceId,
    finished_at: Timestamp,
    standings: Vec<Standing>,
}

impl RaceResult {
    pub fn new(race_id: RaceId, finished_at: Timestamp, standings: Vec<Standing>) -> Self {
        Self {
            race_id,
            finished_at,
            standings,
        }
    }

    pub fn race_id(&self) -> &RaceId {
        &self.race_id
    }

    pub fn finished_at(&self) -> Timestamp {
        self.finished_at
    }

    /// Standings ordered by finish position
    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    pub fn standing_of(&self, participant_id: &ParticipantId) -> Option<&Standing> {
        self.standings
            .iter()
            .find(|s| &s.participant_id == participant_id)
    }
}
