//! Copilot Relay Server
//!
//! Receives signed chat requests from GitHub Copilot, verifies them against
//! the platform's published keys, and streams model output back as
//! Server-Sent Events.

pub mod agent;
pub mod api;
pub mod config;
pub mod relay;
pub mod signing;
pub mod skills;

/// User agent sent on every outbound request.
pub const USER_AGENT: &str = concat!("relay-server/", env!("CARGO_PKG_VERSION"));
