//! ProHandel authentication.
//!
//! Exchanges the API key/secret pair for a short-lived bearer token. The
//! token response nests the value two levels deep
//! (`token.token.value`), an artifact of the upstream auth service.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use super::ProHandelError;

/// Bearer token obtained from ProHandel authentication.
#[derive(Debug, Clone)]
pub struct ProHandelToken {
    /// Bearer token for API requests.
    pub bearer: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

/// Default token lifetime when the auth service does not report one.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 1800;

/// Request body for ProHandel authentication.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    api_key: &'a str,
    secret: &'a str,
}

/// Response from the ProHandel token endpoint. The value is nested:
/// `{ "token": { "token": { "value": "...", "expiresIn": 1800 } } }`.
#[derive(Deserialize)]
struct AuthResponse {
    token: TokenNode,
}

#[derive(Deserialize)]
struct TokenNode {
    token: TokenValue,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenValue {
    value: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Authenticate with ProHandel using the API key/secret pair.
///
/// # Errors
///
/// Returns `ProHandelError::AuthenticationFailed` if the credentials are
/// rejected, `ProHandelError::Http` on transport failure.
#[instrument(skip(client, secret), fields(auth_url = %auth_url))]
pub async fn authenticate(
    client: &reqwest::Client,
    auth_url: &Url,
    api_key: &str,
    secret: &SecretString,
) -> Result<ProHandelToken, ProHandelError> {
    let now = chrono::Utc::now().timestamp();
    let url = format!("{}/token", auth_url.as_str().trim_end_matches('/'));

    let response = client
        .post(&url)
        .json(&AuthRequest {
            api_key,
            secret: secret.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();

    if status.is_success() {
        let auth_response: AuthResponse = response
            .json()
            .await
            .map_err(|e| ProHandelError::Parse(format!("token response: {e}")))?;

        let lifetime = auth_response
            .token
            .token
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        Ok(ProHandelToken {
            bearer: SecretString::from(auth_response.token.token.value),
            expires_at: now + lifetime,
        })
    } else if status == reqwest::StatusCode::UNAUTHORIZED
        || status == reqwest::StatusCode::FORBIDDEN
    {
        Err(ProHandelError::AuthenticationFailed(
            "Invalid credentials".to_string(),
        ))
    } else {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(ProHandelError::AuthenticationFailed(format!(
            "HTTP {status}: {error_text}"
        )))
    }
}

impl ProHandelToken {
    /// Check if the token has expired.
    ///
    /// A 60-second buffer avoids presenting a token that expires while a
    /// request is in flight.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - 60
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_expired() {
        let now = chrono::Utc::now().timestamp();

        // Token that expired half an hour ago
        let expired_token = ProHandelToken {
            bearer: SecretString::from("test"),
            expires_at: now - 1800,
        };
        assert!(expired_token.is_expired());

        // Token that expires in half an hour
        let valid_token = ProHandelToken {
            bearer: SecretString::from("test"),
            expires_at: now + 1800,
        };
        assert!(!valid_token.is_expired());

        // Token that expires in 30 seconds (inside the 60s buffer)
        let almost_expired_token = ProHandelToken {
            bearer: SecretString::from("test"),
            expires_at: now + 30,
        };
        assert!(almost_expired_token.is_expired());
    }

    #[test]
    fn test_auth_response_parses_nested_token() {
        let json = serde_json::json!({
            "token": { "token": { "value": "bearer-xyz", "expiresIn": 900 } }
        });
        let response: AuthResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.token.token.value, "bearer-xyz");
        assert_eq!(response.token.token.expires_in, Some(900));
    }

    #[test]
    fn test_auth_response_without_lifetime() {
        let json = serde_json::json!({
            "token": { "token": { "value": "bearer-xyz" } }
        });
        let response: AuthResponse = serde_json::from_value(json).unwrap();
        assert!(response.token.token.expires_in.is_none());
    }
}
