//! ProHandel POS/ERP API gateway.
//!
//! Two-layer access: API key/secret are exchanged for a short-lived
//! bearer token, which is re-fetched per sync run (with a small expiry
//! buffer) and attached to the changed-voucher and changed-redemption
//! endpoints. The engine only ever reads from ProHandel - the POS is the
//! source of truth for voucher existence and in-store redemption.

pub mod auth;
pub mod client;
pub mod types;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub use client::ProHandelClient;
pub use types::{PosRedemption, PosVoucher};

/// Errors that can occur when interacting with the ProHandel API.
#[derive(Debug, Error)]
pub enum ProHandelError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication failed (invalid key/secret or expired token).
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Abstract POS operations the reconcilers depend on.
#[allow(async_fn_in_trait)]
pub trait PosGateway {
    /// Vouchers created or changed since the given instant.
    async fn vouchers_changed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<PosVoucher>, ProHandelError>;

    /// Redemption events recorded since the given instant.
    async fn redemptions_changed_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<PosRedemption>, ProHandelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProHandelError::AuthenticationFailed("invalid secret".to_string());
        assert_eq!(err.to_string(), "Authentication failed: invalid secret");

        let err = ProHandelError::Api {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 503 - maintenance");
    }
}
