//! Keyrace: multiplayer typing race session coordinator.
//!
//! Accepts WebSocket connections into per-race rooms, runs each race as a
//! single-writer actor, streams live progress, and hands the final result
//! to a leaderboard collaborator exactly once.

// layers
pub mod domain;
pub mod infrastructure;
pub mod room;
pub mod ui;
pub mod usecase;

pub mod config;
