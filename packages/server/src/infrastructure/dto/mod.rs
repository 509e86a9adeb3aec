//! Data Transfer Objects (DTOs) for the race protocol.
//!
//! - `websocket`: frames exchanged over the race WebSocket
//! - `http`: HTTP API responses
//! - `conversion`: domain → DTO mapping

pub mod conversion;
pub mod http;
pub mod websocket;
