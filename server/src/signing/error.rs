//! Signing Error Types

use thiserror::Error;

/// Failure to obtain the key set from the key authority.
#[derive(Debug, Error)]
pub enum KeyFetchError {
    /// Network or TLS failure talking to the key authority.
    #[error("Key authority unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Key authority answered with a non-success status.
    #[error("Key authority returned HTTP {0}")]
    Status(u16),

    /// Key authority body was not a valid key set.
    #[error("Malformed key set: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Key lookup failure.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// No published key carries the requested identifier.
    #[error("Key not found")]
    NotFound,

    #[error(transparent)]
    Fetch(#[from] KeyFetchError),
}

/// Reasons a signed request is rejected.
///
/// Every variant maps to the same client-visible 401; the detail is for logs.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Identifier is not in the current key set.
    #[error("No public key found for key identifier: {0}")]
    UnknownKey(String),

    /// Signature does not match the payload.
    #[error("Request signature verification failed")]
    BadSignature,

    /// Signature header is not base64 of a 64-byte r||s pair.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// Published key is not a P-256 SPKI PEM.
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error(transparent)]
    KeyFetch(#[from] KeyFetchError),
}

/// Result type for signing operations.
pub type SignatureResult<T> = Result<T, SignatureError>;
