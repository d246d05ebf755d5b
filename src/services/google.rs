// src/services/google.rs
//! Google ID token verification.
//!
//! Tokens are checked against Google's tokeninfo endpoint
//! (https://developers.google.com/identity/sign-in/web/backend-auth).
//! The network fetch and the claim validation are separated so the
//! validation ladder is testable without Google.

use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::common::safe_email_log;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// The identity extracted from a verified Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleIdentity {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Error)]
pub enum GoogleVerifyError {
    /// The token itself is bad: malformed, expired, wrong audience,
    /// or missing required claims. Maps to 401.
    #[error("invalid id_token: {0}")]
    InvalidToken(String),
    /// Google could not be reached. Maps to 503, retryable by the client.
    #[error("token verification service unavailable: {0}")]
    Unavailable(String),
}

pub struct GoogleService {
    http: Client,
    client_id: Option<String>,
}

impl GoogleService {
    pub fn new(http: Client, client_id: Option<String>) -> Self {
        Self { http, client_id }
    }

    /// Verify an ID token and extract the caller's Google identity.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<GoogleIdentity, GoogleVerifyError> {
        let url = format!("{}?id_token={}", TOKENINFO_URL, id_token);

        debug!("Initiating Google token validation with tokeninfo endpoint");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            error!(error = %e, endpoint = TOKENINFO_URL, "HTTP error contacting Google tokeninfo endpoint");
            GoogleVerifyError::Unavailable(e.to_string())
        })?;

        let status = resp.status();
        debug!(http_status = %status, "Received response from Google tokeninfo endpoint");

        if !status.is_success() {
            // Google answers 400/401 for bad tokens; anything else is on them
            return match status.as_u16() {
                400 | 401 => {
                    warn!(http_status = %status, "Google tokeninfo rejected token");
                    Err(GoogleVerifyError::InvalidToken(
                        "expired or invalid id_token".to_string(),
                    ))
                }
                _ => {
                    warn!(http_status = %status, "Google tokeninfo returned error status");
                    Err(GoogleVerifyError::Unavailable(format!(
                        "tokeninfo returned {}",
                        status
                    )))
                }
            };
        }

        let body = resp.json::<serde_json::Value>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Google tokeninfo JSON response");
            GoogleVerifyError::InvalidToken("malformed id_token".to_string())
        })?;

        identity_from_tokeninfo(&body, self.client_id.as_deref())
    }
}

/// Validate the tokeninfo claims and extract the identity.
///
/// Checks, in order: required email/sub claims, email_verified,
/// expiration, and (when a client id is configured) audience.
pub fn identity_from_tokeninfo(
    body: &serde_json::Value,
    expected_client_id: Option<&str>,
) -> Result<GoogleIdentity, GoogleVerifyError> {
    let email = body.get("email").and_then(|v| v.as_str());
    let sub = body.get("sub").and_then(|v| v.as_str());

    let (email, sub) = match (email, sub) {
        (Some(e), Some(s)) if !s.is_empty() => (e, s),
        _ => {
            warn!(
                has_email = email.is_some(),
                has_sub = sub.is_some(),
                "Google token missing required fields (email/sub)"
            );
            return Err(GoogleVerifyError::InvalidToken(
                "token missing required fields".to_string(),
            ));
        }
    };

    if let Some(email_verified) = body.get("email_verified") {
        // tokeninfo serializes booleans as strings
        let verified = match email_verified {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => s == "true",
            _ => false,
        };
        if !verified {
            warn!(email = %safe_email_log(email), "Google token contains unverified email address");
        }
    }

    if let Some(exp) = claim_as_i64(body, "exp") {
        let current_time = Utc::now().timestamp();
        if exp < current_time {
            warn!(token_exp = exp, current_time, "Google token has expired");
            return Err(GoogleVerifyError::InvalidToken(
                "token has expired".to_string(),
            ));
        }
    }

    if let Some(client_id) = expected_client_id {
        match body.get("aud").and_then(|v| v.as_str()) {
            Some(aud) if aud == client_id => {
                debug!(token_audience = %aud, "Google token audience validation successful");
            }
            Some(aud) => {
                warn!(
                    token_audience = %aud,
                    expected_client_id = %client_id,
                    "Google token audience validation failed"
                );
                return Err(GoogleVerifyError::InvalidToken(
                    "token audience mismatch".to_string(),
                ));
            }
            None => {
                warn!(expected_client_id = %client_id, "Google token missing audience field");
                return Err(GoogleVerifyError::InvalidToken(
                    "token missing audience".to_string(),
                ));
            }
        }
    }

    Ok(GoogleIdentity {
        subject: sub.to_string(),
        email: email.to_string(),
        name: body
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        picture: body
            .get("picture")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

/// tokeninfo serializes numeric claims as strings
fn claim_as_i64(body: &serde_json::Value, key: &str) -> Option<i64> {
    match body.get(key) {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    }
}
