//! Terminal client for Keyrace typing races.

pub mod error;
pub mod formatter;
pub mod reconnect;
pub mod runner;
pub mod session;
pub mod typing;
pub mod ui;

pub use runner::{ClientConfig, run_client};
