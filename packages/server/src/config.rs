//! Runtime settings shared by the Room Manager and the Sessions.

use std::time::Duration;

use crate::domain::RoomSettings;

/// Per-connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub heartbeat_interval: Duration,
    /// Consecutive missed heartbeats after which the session is closed
    pub max_missed_heartbeats: u32,
    /// How long a new connection may take to send its `join` frame
    pub join_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(5),
            max_missed_heartbeats: 3,
            join_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RaceSettings {
    pub room: RoomSettings,
    pub session: SessionSettings,
    /// How long a completed race id keeps answering `race_not_found`
    pub tombstone_ttl: Duration,
}

impl Default for RaceSettings {
    fn default() -> Self {
        Self {
            room: RoomSettings::default(),
            session: SessionSettings::default(),
            tombstone_ttl: Duration::from_secs(600),
        }
    }
}
