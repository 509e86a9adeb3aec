//! メッセージ送信（通知）の抽象
//!
//! Room アクターは配信先を「参加者 ID」で指定し、どのトランスポートで
//! 届けるかは実装側に任せます。

use thiserror::Error;
use tokio::sync::mpsc;

use super::value_object::{ParticipantId, SessionId};

/// Outbound frame channel of one session (serialized JSON text)
pub type PusherChannel = mpsc::UnboundedSender<String>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("participant '{0}' has no attached session")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// Delivery of serialized frames to attached sessions.
///
/// Owned by exactly one Room actor, so the methods take `&mut self` instead
/// of locking.
pub trait MessagePusher: Send {
    /// Attach `channel` as the participant's live link and return the channel
    /// it replaces, if any.
    fn register_client(
        &mut self,
        participant_id: ParticipantId,
        session: SessionId,
        channel: PusherChannel,
    ) -> Option<PusherChannel>;

    /// Drop the participant's link if it still belongs to `session`.
    fn unregister_client(&mut self, participant_id: &ParticipantId, session: SessionId) -> bool;

    fn push_to(&self, participant_id: &ParticipantId, content: &str)
    -> Result<(), MessagePushError>;

    /// Push to every target that has a link; missing targets are skipped.
    fn broadcast(&self, targets: &[ParticipantId], content: &str) -> Result<(), MessagePushError>;

    fn connected(&self) -> Vec<ParticipantId>;
}
