//! Infrastructure layer.
//!
//! Concrete implementations of the domain's collaborator traits and the
//! wire DTOs.

pub mod dto;
pub mod identity;
pub mod message_pusher;
pub mod prompt;
pub mod reporter;
