//! Closed race ids, remembered for a while so late joins are turned away.

use dashmap::DashMap;

use crate::domain::{RaceId, Timestamp};

#[derive(Debug, Default)]
pub struct Tombstones {
    expires_at: DashMap<RaceId, Timestamp>,
}

impl Tombstones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, race_id: RaceId, expires_at: Timestamp) {
        self.expires_at.insert(race_id, expires_at);
    }

    pub fn contains(&self, race_id: &RaceId, now: Timestamp) -> bool {
        self.expires_at
            .get(race_id)
            .is_some_and(|expires_at| now < *expires_at)
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge(&self, now: Timestamp) -> usize {
        let before = self.expires_at.len();
        self.expires_at.retain(|_, expires_at| now < *expires_at);
        before - self.expires_at.len()
    }

    pub fn len(&self) -> usize {
        self.expires_at.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expires_at.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_expires() {
        // テスト項目: 期限前は残り、期限後は purge で消える
        // given (前提条件):
        let tombstones = Tombstones::new();
        let race = RaceId::new("race-1".to_string()).unwrap();
        tombstones.insert(race.clone(), Timestamp::new(1_000));

        // when (操作) / then (期待する結果):
        assert!(tombstones.contains(&race, Timestamp::new(999)));
        assert!(!tombstones.contains(&race, Timestamp::new(1_000)));
        assert_eq!(tombstones.purge(Timestamp::new(1_000)), 1);
        assert!(tombstones.is_empty());
    }
}
