//! Identity Types

use serde::{Deserialize, Serialize};

/// Subset of the authenticated user's profile used to enrich the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    /// Account login name.
    pub login: String,
}
