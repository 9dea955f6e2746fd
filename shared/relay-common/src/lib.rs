//! Copilot Relay Common Library
//!
//! Wire types exchanged with the Copilot platform, the key authority,
//! the identity endpoint and OpenAI-compatible model backends.

pub mod types;

pub use types::*;
