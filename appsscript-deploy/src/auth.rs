//! Service account authorization (OAuth 2.0 JWT bearer grant).
//!
//! Signs an RS256 assertion with the service account's private key and exchanges it at the
//! key's `token_uri` for a short-lived access token. Implements the core
//! [`Authorizer`] trait so the pipeline never sees the transport.

use appsscript_deploy_core::contract::{AccessToken, Authorizer};
use appsscript_deploy_core::credentials::ServiceAccountKey;
use appsscript_deploy_core::error::AuthError;
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Claims of the signed assertion sent to the token endpoint.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Builds and signs the JWT assertion for `credentials` and `scopes`, issued at `issued_at`.
pub fn sign_assertion(
    credentials: &ServiceAccountKey,
    scopes: &[String],
    issued_at: i64,
) -> Result<String, AuthError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = credentials.private_key_id.clone();
    let claims = AssertionClaims {
        iss: credentials.client_email.clone(),
        scope: scopes.join(" "),
        aud: credentials.token_uri.clone(),
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
        .map_err(|e| AuthError::InvalidKey(e.to_string()))?;
    encode(&header, &claims, &key).map_err(|e| AuthError::InvalidKey(e.to_string()))
}

/// Exchanges service account assertions for access tokens over HTTP.
pub struct ServiceAccountAuthorizer {
    http: reqwest::Client,
}

impl ServiceAccountAuthorizer {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Authorizer for ServiceAccountAuthorizer {
    async fn authorize(
        &self,
        credentials: &ServiceAccountKey,
        scopes: Vec<String>,
    ) -> Result<AccessToken, AuthError> {
        tracing::info!(
            client_email = %credentials.client_email,
            token_uri = %credentials.token_uri,
            scopes = scopes.len(),
            "Requesting access token"
        );
        let assertion = sign_assertion(credentials, &scopes, Utc::now().timestamp())?;

        let response = self
            .http
            .post(&credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "Token endpoint unreachable");
                AuthError::Transport(e.to_string())
            })?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorBody>(&body) {
                Ok(TokenErrorBody {
                    error,
                    error_description: Some(description),
                }) => format!("{error}: {description}"),
                Ok(TokenErrorBody { error, .. }) => error,
                Err(_) => body.trim().to_string(),
            };
            tracing::error!(status = status.as_u16(), message = %message, "Token request rejected");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::Transport(format!("invalid token response: {e}")))?;
        tracing::info!(expires_in = ?token.expires_in, "Access token obtained");
        Ok(AccessToken {
            token: token.access_token,
            expires_in: token.expires_in,
        })
    }
}
