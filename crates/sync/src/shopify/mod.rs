//! Shopify Admin REST gateway.
//!
//! Thin request/response client for the three operations the engine
//! needs: paging customers, creating gift cards, and disabling gift
//! cards. Authenticated with a private-app Admin API access token via the
//! `X-Shopify-Access-Token` header.
//!
//! Every request carries a 10-second timeout; the engine never hangs on
//! the storefront, it surfaces the failure and lets the next trigger
//! retry.

pub mod customers;
pub mod gift_cards;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::ShopifyConfig;

pub use customers::CustomerPage;
pub use types::{OrderEvent, ShopifyCustomer, WebhookEvent};

/// Per-request timeout for all Admin API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Unauthorized (invalid or revoked access token).
    #[error("Unauthorized: invalid access token")]
    Unauthorized,

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Abstract storefront operations the reconcilers depend on.
#[allow(async_fn_in_trait)]
pub trait StorefrontGateway {
    /// Fetch one page of customers; `page_token` is the cursor returned
    /// by the previous page, `None` for the first page.
    async fn list_customers(
        &self,
        page_token: Option<&str>,
    ) -> Result<CustomerPage, ShopifyError>;

    /// Create a gift card with the given code and value; returns the gift
    /// card id.
    async fn create_gift_card(
        &self,
        code: &str,
        initial_value: rust_decimal::Decimal,
        note: &str,
    ) -> Result<String, ShopifyError>;

    /// Permanently disable a gift card.
    async fn disable_gift_card(&self, gift_card_id: &str) -> Result<(), ShopifyError>;
}

/// Shopify Admin REST API client.
#[derive(Clone)]
pub struct ShopifyAdminClient {
    inner: Arc<ShopifyAdminClientInner>,
}

struct ShopifyAdminClientInner {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
}

impl ShopifyAdminClient {
    /// Create a new Admin API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build (e.g., the
    /// token contains bytes not valid in a header).
    pub fn new(config: &ShopifyConfig, page_size: u32) -> Result<Self, ShopifyError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Shopify-Access-Token",
            HeaderValue::from_str(config.admin_token.expose_secret())
                .map_err(|e| ShopifyError::Parse(format!("invalid access token format: {e}")))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let base_url = format!(
            "https://{}/admin/api/{}",
            config.store, config.api_version
        );

        Ok(Self {
            inner: Arc::new(ShopifyAdminClientInner {
                client,
                base_url,
                page_size,
            }),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    pub(crate) fn page_size(&self) -> u32 {
        self.inner.page_size
    }

    /// Map a non-success response to the error taxonomy.
    pub(crate) async fn error_for(response: reqwest::Response) -> ShopifyError {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return ShopifyError::RateLimited(retry_after);
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return ShopifyError::Unauthorized;
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        ShopifyError::Api {
            status: status.as_u16(),
            message: message.chars().take(200).collect(),
        }
    }
}

impl StorefrontGateway for ShopifyAdminClient {
    async fn list_customers(
        &self,
        page_token: Option<&str>,
    ) -> Result<CustomerPage, ShopifyError> {
        self.fetch_customer_page(page_token).await
    }

    async fn create_gift_card(
        &self,
        code: &str,
        initial_value: rust_decimal::Decimal,
        note: &str,
    ) -> Result<String, ShopifyError> {
        self.create_gift_card_rest(code, initial_value, note).await
    }

    async fn disable_gift_card(&self, gift_card_id: &str) -> Result<(), ShopifyError> {
        self.disable_gift_card_rest(gift_card_id).await
    }
}
