//! ECDSA P-256 Request Verification
//!
//! The platform signs the exact request body bytes with ECDSA over P-256
//! and SHA-256. Signatures arrive base64 encoded in IEEE P1363 form
//! (32-byte r followed by 32-byte s), never ASN.1 DER.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use p256::ecdsa::signature::Verifier as _;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use tracing::instrument;

use super::error::{KeyStoreError, SignatureError, SignatureResult};
use super::keys::KeyStore;

/// Length of a raw r||s P-256 signature.
const P1363_SIGNATURE_LEN: usize = 64;

/// Checks inbound signatures against the key store.
#[derive(Clone)]
pub struct SignatureVerifier {
    keys: Arc<KeyStore>,
}

impl SignatureVerifier {
    pub const fn new(keys: Arc<KeyStore>) -> Self {
        Self { keys }
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.keys
    }

    /// Verify `signature_b64` over `raw_body` with the key named `key_id`.
    ///
    /// `raw_body` must be the bytes as received; any re-serialization can
    /// reorder fields or change whitespace and break a valid signature.
    #[instrument(skip(self, raw_body, signature_b64), fields(body_len = raw_body.len()))]
    pub async fn verify(
        &self,
        raw_body: &[u8],
        key_id: &str,
        signature_b64: &str,
    ) -> SignatureResult<()> {
        let key = match self.keys.get_key(key_id).await {
            Ok(key) => key,
            Err(KeyStoreError::NotFound) => {
                return Err(SignatureError::UnknownKey(key_id.to_string()))
            }
            Err(KeyStoreError::Fetch(e)) => return Err(e.into()),
        };

        verify_with_pem(&key.material, raw_body, signature_b64)
    }
}

/// Verify a signature against an SPKI PEM encoded P-256 key.
pub fn verify_with_pem(pem: &str, raw_body: &[u8], signature_b64: &str) -> SignatureResult<()> {
    let verifying_key = VerifyingKey::from_public_key_pem(pem)
        .map_err(|e| SignatureError::InvalidKeyMaterial(e.to_string()))?;

    let signature = decode_signature(signature_b64)?;

    verifying_key
        .verify(raw_body, &signature)
        .map_err(|_| SignatureError::BadSignature)
}

fn decode_signature(signature_b64: &str) -> SignatureResult<Signature> {
    let bytes = STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))?;

    if bytes.len() != P1363_SIGNATURE_LEN {
        return Err(SignatureError::MalformedSignature(format!(
            "expected {P1363_SIGNATURE_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    Signature::from_slice(&bytes)
        .map_err(|_| SignatureError::MalformedSignature("scalar out of range".to_string()))
}
