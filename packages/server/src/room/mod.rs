//! Room runtime.
//!
//! - `actor`: one task per race, the only writer of its `Room`
//! - `handle`: how everything else talks to a room
//! - `manager`: race id → live room registry

mod actor;
pub mod clock;
pub mod command;
pub mod handle;
pub mod manager;
pub mod tombstone;

pub use actor::RoomExit;
pub use clock::TokioClock;
pub use command::{JoinAccepted, RoomCommand, RoomSnapshot};
pub use handle::RoomHandle;
pub use manager::RoomManager;
pub use tombstone::Tombstones;
