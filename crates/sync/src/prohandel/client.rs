//! ProHandel API client.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

use crate::config::ProHandelConfig;

use super::{
    PosGateway, ProHandelError,
    auth::{self, ProHandelToken},
    types::{PosRedemption, PosVoucher},
};

/// Per-request timeout for all ProHandel calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// ProHandel API client with an in-memory token cache.
///
/// The bearer token is short-lived and re-fetched on demand; a cached
/// token is reused until it enters its expiry buffer.
#[derive(Clone)]
pub struct ProHandelClient {
    inner: Arc<ProHandelClientInner>,
}

struct ProHandelClientInner {
    client: reqwest::Client,
    auth_url: Url,
    api_url: Url,
    api_key: String,
    api_secret: SecretString,
    token: RwLock<Option<ProHandelToken>>,
}

impl ProHandelClient {
    /// Create a new ProHandel API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &ProHandelConfig) -> Result<Self, ProHandelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(ProHandelClientInner {
                client,
                auth_url: config.auth_url.clone(),
                api_url: config.api_url.clone(),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                token: RwLock::new(None),
            }),
        })
    }

    /// Get a valid bearer token, re-authenticating when the cached one is
    /// missing or inside its expiry buffer.
    async fn bearer(&self) -> Result<SecretString, ProHandelError> {
        {
            let cached = self.inner.token.read().await;
            if let Some(token) = cached.as_ref()
                && !token.is_expired()
            {
                return Ok(token.bearer.clone());
            }
        }

        let token = auth::authenticate(
            &self.inner.client,
            &self.inner.auth_url,
            &self.inner.api_key,
            &self.inner.api_secret,
        )
        .await?;
        let bearer = token.bearer.clone();

        *self.inner.token.write().await = Some(token);
        Ok(bearer)
    }

    /// Execute an authenticated GET against the API base.
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProHandelError> {
        let bearer = self.bearer().await?;
        let url = format!(
            "{}{path}",
            self.inner.api_url.as_str().trim_end_matches('/')
        );

        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(bearer.expose_secret())
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Token revoked server-side; drop the cache so the next run
            // re-authenticates.
            *self.inner.token.write().await = None;
            return Err(ProHandelError::AuthenticationFailed(
                "bearer token rejected".to_string(),
            ));
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProHandelError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProHandelError::Parse(format!("{path}: {e}")))
    }
}

impl PosGateway for ProHandelClient {
    #[instrument(skip(self))]
    async fn vouchers_changed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<PosVoucher>, ProHandelError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.get(&format!("/voucher/changed/{since}")).await
    }

    #[instrument(skip(self))]
    async fn redemptions_changed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<PosRedemption>, ProHandelError> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.get(&format!("/voucher/redemption/changed/{since}"))
            .await
    }
}
