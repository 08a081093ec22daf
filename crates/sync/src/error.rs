//! Unified error handling for the sync engine.
//!
//! The taxonomy matters more than the shape: transient external failures
//! are safe to retry on the next trigger because they never mutate
//! internal state; constraint violations are control flow, not faults;
//! unresolvable records are skipped and counted, never retried
//! automatically.

use thiserror::Error;

use crate::prohandel::ProHandelError;
use crate::shopify::ShopifyError;
use crate::store::StoreError;

/// Top-level error type for reconciliation operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Identity store operation failed.
    #[error("identity store error: {0}")]
    Store(#[from] StoreError),

    /// Storefront API call failed.
    #[error("storefront API error: {0}")]
    Storefront(#[from] ShopifyError),

    /// POS API call failed.
    #[error("POS API error: {0}")]
    Pos(#[from] ProHandelError),

    /// The source event lacks the key needed for safe matching.
    /// Skipped and counted; never retried automatically.
    #[error("record cannot be matched: {0}")]
    Unresolvable(String),

    /// A source event carried an external identifier already bound to a
    /// different record. Flagged for manual review, never auto-merged.
    #[error("external identifier conflict: {0}")]
    IdentifierConflict(String),

    /// The webhook payload could not be interpreted.
    #[error("malformed event payload: {0}")]
    MalformedEvent(String),
}

impl SyncError {
    /// Whether this failure is transient: nothing was mutated and the
    /// same operation is safe to retry on the next webhook delivery or
    /// poll cycle.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::Storefront(_) | Self::Pos(_) => true,
            Self::Unresolvable(_) | Self::IdentifierConflict(_) | Self::MalformedEvent(_) => false,
        }
    }
}
