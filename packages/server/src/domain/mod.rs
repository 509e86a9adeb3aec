//! Domain layer.
//!
//! The race state machine and the interfaces of everything it talks to.
//! Nothing in here performs I/O.

pub mod entity;
pub mod error;
pub mod identity;
pub mod message_pusher;
pub mod prompt;
pub mod reporter;
pub mod scoring;
pub mod value_object;

pub use entity::{
    Audience, JoinOutcome, Outbound, Participant, ProgressOutcome, Progress, RaceResult,
    RaceState, ReportStatus, Room, RoomEvent, RoomSettings, Standing,
};
pub use entity::room::CloseReason;
pub use error::{
    ForceStartError, IdentityError, InvalidProgress, RaceError, ReportError, ValueObjectError,
};
pub use identity::{Credentials, Identity, IdentityProvider};
pub use message_pusher::{MessagePushError, MessagePusher, PusherChannel};
pub use prompt::PromptSource;
pub use reporter::{LeaderboardReporter, ReportAck};
pub use value_object::{DisplayName, ParticipantId, Prompt, RaceId, SessionId, Timestamp};
