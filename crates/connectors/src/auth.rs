//! Access tokens for the mailbox admin API.
//!
//! A token is either supplied directly or requested from the managed
//! identity endpoint of the hosting environment.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use log::debug;
use serde::Deserialize;

/// Resource the admin API token is issued for.
pub const OUTLOOK_RESOURCE: &str = "https://outlook.office365.com/";

const IDENTITY_API_VERSION: &str = "2019-08-01";

/// Managed identity endpoint of the hosting environment.
#[derive(Debug, Clone)]
pub struct ManagedIdentity {
    endpoint: String,
    header: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Claims {
    tid: Option<String>,
}

impl ManagedIdentity {
    pub fn new(endpoint: impl Into<String>, header: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            header: header.into(),
        }
    }

    /// Read `IDENTITY_ENDPOINT` and `IDENTITY_HEADER`.
    pub fn from_env() -> Result<Self> {
        let read = |name: &str| {
            std::env::var(name).map_err(|_| Error::Config(format!("{name} is not set")))
        };
        Ok(Self::new(read("IDENTITY_ENDPOINT")?, read("IDENTITY_HEADER")?))
    }

    /// Request a token for `resource`.
    pub fn fetch_token(&self, resource: &str) -> Result<String> {
        debug!("Requesting managed identity token from {}", self.endpoint);

        let response: TokenResponse = ureq::Agent::new_with_defaults()
            .get(&self.endpoint)
            .query("resource", resource)
            .query("api-version", IDENTITY_API_VERSION)
            .header("X-IDENTITY-HEADER", &self.header)
            .call()
            .map_err(|e| Error::InvalidToken(format!("managed identity request failed: {e}")))?
            .body_mut()
            .read_json()
            .map_err(|e| Error::InvalidToken(format!("managed identity response: {e}")))?;

        Ok(response.access_token)
    }
}

/// Use the explicit token when given, otherwise ask the managed identity.
pub fn resolve_access_token(explicit: Option<&str>) -> Result<String> {
    match explicit.map(clean_token) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        _ => ManagedIdentity::from_env()?.fetch_token(OUTLOOK_RESOURCE),
    }
}

/// Tenant id (`tid` claim) of a JWT access token.
///
/// The signature is not verified.
pub fn tenant_id(token: &str) -> Result<String> {
    let mut parts = clean_token(token).split('.');
    let (Some(_), Some(payload), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(Error::InvalidToken("not a JWT".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::InvalidToken(format!("payload is not base64: {e}")))?;
    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| Error::InvalidToken(format!("payload is not JSON: {e}")))?;

    claims
        .tid
        .filter(|tid| !tid.is_empty())
        .ok_or_else(|| Error::InvalidToken("missing tid claim".to_string()))
}

/// Tokens pasted into env files often keep their quotes
fn clean_token(token: &str) -> &str {
    token.trim().trim_matches('"').trim()
}
