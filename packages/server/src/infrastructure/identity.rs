//! Identity provider that trusts the connection request.
//!
//! Authentication is handled upstream; by the time a request reaches the
//! gateway the participant id and display name in it are taken as given.

use async_trait::async_trait;

use crate::domain::{
    Credentials, DisplayName, Identity, IdentityError, IdentityProvider, ParticipantId,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct QueryIdentityProvider;

impl QueryIdentityProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IdentityProvider for QueryIdentityProvider {
    async fn resolve(&self, credentials: &Credentials) -> Result<Identity, IdentityError> {
        let raw_id = credentials
            .participant_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(IdentityError::Missing)?;
        let participant_id = ParticipantId::new(raw_id.to_string())?;
        // display name falls back to the participant id
        let display_name = match credentials.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => DisplayName::new(name.to_string())?,
            _ => DisplayName::new(raw_id.to_string())?,
        };
        Ok(Identity {
            participant_id,
            display_name,
        })
    }
}
