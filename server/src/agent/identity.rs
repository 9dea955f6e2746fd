//! Caller Identity Lookup
//!
//! Best-effort enrichment: resolves the caller's login with their own
//! token. Callers treat every error as "no enrichment".

use std::time::Duration;

use relay_common::IdentityProfile;
use thiserror::Error;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Identity endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Identity endpoint returned HTTP {0}")]
    Status(u16),

    #[error("Malformed identity response: {0}")]
    Decode(String),
}

/// Client for the identity endpoint.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    url: String,
}

impl IdentityClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Login of the account owning `token`.
    pub async fn lookup_login(&self, token: &str) -> Result<String, EnrichmentError> {
        let response = self
            .http
            .get(&self.url)
            .bearer_auth(token)
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status.as_u16()));
        }

        let profile: IdentityProfile = response
            .json()
            .await
            .map_err(|e| EnrichmentError::Decode(e.to_string()))?;

        Ok(profile.login)
    }
}
