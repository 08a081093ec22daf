//! Sync engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SYNC_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//! - `SHOPIFY_STORE` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_ADMIN_TOKEN` - Admin API access token (HIGH PRIVILEGE)
//! - `PROHANDEL_API_KEY` - ProHandel API key
//! - `PROHANDEL_API_SECRET` - ProHandel API secret
//!
//! ## Optional
//! - `SHOPIFY_API_VERSION` - API version (default: 2024-10)
//! - `PROHANDEL_AUTH_URL` - Auth endpoint base (default: `https://auth.prohandel.cloud/api/v4`)
//! - `PROHANDEL_API_URL` - API base (default: `https://linde.prohandel.de/api/v2`)
//! - `SYNC_LOOKBACK_MINUTES` - Poll window lookback (default: 120). Must
//!   exceed the poll interval plus scheduler drift, or changed records can
//!   fall between consecutive windows.
//! - `SYNC_PAGE_SIZE` - Customer batch page size (default: 250, the
//!   Shopify REST maximum)

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_SHOPIFY_API_VERSION: &str = "2024-10";
const DEFAULT_PROHANDEL_AUTH_URL: &str = "https://auth.prohandel.cloud/api/v4";
const DEFAULT_PROHANDEL_API_URL: &str = "https://linde.prohandel.de/api/v2";
const DEFAULT_LOOKBACK_MINUTES: i64 = 120;
const DEFAULT_PAGE_SIZE: u32 = 250;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// `PostgreSQL` connection URL (contains password)
    pub database_url: SecretString,
    /// Shopify Admin API configuration
    pub shopify: ShopifyConfig,
    /// ProHandel API configuration
    pub prohandel: ProHandelConfig,
    /// Poll window lookback in minutes
    pub lookback_minutes: i64,
    /// Customer batch page size
    pub page_size: u32,
}

/// Shopify Admin API configuration.
///
/// Implements `Debug` manually to redact the HIGH PRIVILEGE token.
#[derive(Clone)]
pub struct ShopifyConfig {
    /// Shopify store domain (e.g., your-store.myshopify.com)
    pub store: String,
    /// Shopify API version (e.g., 2024-10)
    pub api_version: String,
    /// Admin API access token (HIGH PRIVILEGE - full store access)
    pub admin_token: SecretString,
}

impl std::fmt::Debug for ShopifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyConfig")
            .field("store", &self.store)
            .field("api_version", &self.api_version)
            .field("admin_token", &"[REDACTED]")
            .finish()
    }
}

/// ProHandel API configuration.
///
/// Implements `Debug` manually to redact the credentials.
#[derive(Clone)]
pub struct ProHandelConfig {
    /// Token exchange endpoint base URL
    pub auth_url: Url,
    /// API base URL
    pub api_url: Url,
    /// API key
    pub api_key: String,
    /// API secret
    pub api_secret: SecretString,
}

impl std::fmt::Debug for ProHandelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProHandelConfig")
            .field("auth_url", &self.auth_url.as_str())
            .field("api_url", &self.api_url.as_str())
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("SYNC_DATABASE_URL")?;
        let shopify = ShopifyConfig::from_env()?;
        let prohandel = ProHandelConfig::from_env()?;

        let lookback_minutes = get_parsed_or_default(
            "SYNC_LOOKBACK_MINUTES",
            DEFAULT_LOOKBACK_MINUTES,
        )?;
        let page_size = get_parsed_or_default("SYNC_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;

        Ok(Self {
            database_url,
            shopify,
            prohandel,
            lookback_minutes,
            page_size,
        })
    }

    /// The poll window lookback as a chrono duration.
    #[must_use]
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.lookback_minutes)
    }
}

impl ShopifyConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            store: get_required_env("SHOPIFY_STORE")?,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_SHOPIFY_API_VERSION),
            admin_token: get_required_secret("SHOPIFY_ADMIN_TOKEN")?,
        })
    }
}

impl ProHandelConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let auth_url = get_url_or_default("PROHANDEL_AUTH_URL", DEFAULT_PROHANDEL_AUTH_URL)?;
        let api_url = get_url_or_default("PROHANDEL_API_URL", DEFAULT_PROHANDEL_API_URL)?;

        Ok(Self {
            auth_url,
            api_url,
            api_key: get_required_env("PROHANDEL_API_KEY")?,
            api_secret: get_required_secret("PROHANDEL_API_SECRET")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed into `T`, with a default.
fn get_parsed_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Get a URL environment variable with a default.
fn get_url_or_default(key: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = get_env_or_default(key, default);
    Url::parse(&raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
