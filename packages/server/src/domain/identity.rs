//! 参加者の本人確認
//!
//! 認証そのものは外部サービスの責務です。ここでは接続要求に付随する
//! 資格情報から参加者 ID と表示名を得るためのインターフェースだけを定義します。

use async_trait::async_trait;

use super::{
    error::IdentityError,
    value_object::{DisplayName, ParticipantId},
};

/// Credentials presented alongside a connection request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub participant_id: Option<String>,
    pub display_name: Option<String>,
}

/// Resolved participant identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub participant_id: ParticipantId,
    pub display_name: DisplayName,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, credentials: &Credentials) -> Result<Identity, IdentityError>;
}
