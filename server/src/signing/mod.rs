//! Request Signature Verification
//!
//! Every inbound platform request carries an ECDSA P-256 signature over its
//! raw body, made with one of the keys the platform publishes.
//!
//! - `keys`: TTL cache of the published key set (single-flight refresh)
//! - `verify`: signature check over the exact body bytes
//! - `middleware`: axum layer rejecting unsigned or mis-signed requests

pub mod error;
pub mod keys;
pub mod middleware;
pub mod verify;

pub use error::{KeyFetchError, KeyStoreError, SignatureError, SignatureResult};
pub use keys::{KeySet, KeyStore, PublicKey};
pub use middleware::{require_signature, VerifiedRequest};
pub use verify::{verify_with_pem, SignatureVerifier};

/// Header naming the key that signed the request.
pub const KEY_IDENTIFIER_HEADER: &str = "x-github-public-key-identifier";

/// Header carrying the base64 P1363 signature.
pub const SIGNATURE_HEADER: &str = "x-github-public-key-signature";
