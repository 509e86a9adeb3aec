//! Domain entities.

pub mod participant;
pub mod result;
pub mod room;

pub use participant::{Participant, Progress};
pub use result::{RaceResult, Standing};
pub use room::{
    Audience, JoinOutcome, Outbound, ProgressOutcome, RaceState, ReportStatus, Room, RoomEvent,
    RoomSettings,
};
