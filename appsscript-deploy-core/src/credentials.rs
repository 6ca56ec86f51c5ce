//! Resolves the service account key from a single configuration value.
//!
//! CI systems store the key either as raw JSON or wrapped in base64, so both are
//! accepted: the literal text is tried first, then its base64 decoding.

use std::fmt;

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::error::CredentialError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Service account credential material. Never persisted; `Debug` redacts the private key.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Parses `value` as raw JSON or base64-encoded JSON.
///
/// The first candidate that parses and carries both `private_key` and
/// `client_email` wins. Failures on individual candidates are not reported.
pub fn resolve_credentials(value: &str) -> Result<ServiceAccountKey, CredentialError> {
    let trimmed = value.trim();
    let mut candidates = vec![trimmed.to_string()];
    if let Some(decoded) = decode_base64(trimmed) {
        candidates.push(decoded);
    }

    for (index, candidate) in candidates.iter().enumerate() {
        match serde_json::from_str::<ServiceAccountKey>(candidate) {
            Ok(key) if !key.private_key.is_empty() && !key.client_email.is_empty() => {
                debug!(
                    candidate = index,
                    client_email = %key.client_email,
                    "Resolved service account key"
                );
                return Ok(key);
            }
            _ => continue,
        }
    }

    Err(CredentialError(
        "unable to parse credential material".to_string(),
    ))
}

// `base64` wraps its output at 76 columns by default.
fn decode_base64(value: &str) -> Option<String> {
    let compact: String = value.split_whitespace().collect();
    let bytes = STANDARD
        .decode(&compact)
        .or_else(|_| STANDARD_NO_PAD.decode(&compact))
        .ok()?;
    String::from_utf8(bytes).ok()
}
