//! Public Key Types

use serde::{Deserialize, Serialize};

/// A signing key published by the platform's key authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    /// Identifier sent alongside each signed request.
    pub key_identifier: String,
    /// SPKI PEM encoded public key.
    pub key: String,
    /// Whether the platform currently signs with this key.
    #[serde(default)]
    pub is_current: bool,
}

/// Response body of the key authority endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicKeysResponse {
    #[serde(default)]
    pub public_keys: Vec<PublicKeyEntry>,
}
