//! Shared Types

mod chat;
mod identity;
mod keys;

pub use chat::*;
pub use identity::*;
pub use keys::*;
