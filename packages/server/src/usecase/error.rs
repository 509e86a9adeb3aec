//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{IdentityError, RaceError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRaceError {
    #[error(transparent)]
    Race(#[from] RaceError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}
