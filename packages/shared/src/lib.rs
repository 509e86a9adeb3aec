//! Utilities shared by the keyrace server and client.

pub mod logger;
pub mod time;
