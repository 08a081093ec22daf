//! The reconcilers: matching, upsert, and state-transition logic.
//!
//! Each reconciler is constructed per invocation over borrowed store and
//! gateway handles and holds no state across runs - everything it needs
//! is re-derived from the store each time. Correctness under concurrent
//! triggers comes from the data layer (unique constraints, monotonic
//! transitions, per-order application keys), not from coordination here.

pub mod customers;
pub mod resolver;
pub mod vouchers;
pub mod window;

use serde::Serialize;

pub use customers::CustomerReconciler;
pub use vouchers::VoucherReconciler;
pub use window::SyncWindow;

/// What a single-record reconciliation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Created,
    Updated,
}

/// Aggregate counts for a customer batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomerBatchStats {
    /// Records that reconciled successfully.
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    /// Records skipped for a missing matching key.
    pub skipped: u64,
    /// Records that failed; the batch continued past them.
    pub errors: u64,
}

/// Aggregate counts for one POS voucher poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoucherSyncStats {
    /// New vouchers persisted from POS issuance.
    pub issued: u64,
    /// Vouchers transitioned to redeemed from POS events.
    pub redeemed: u64,
    /// Changed/redemption events that matched nothing new to do.
    pub skipped: u64,
    /// Per-record store failures; the run continued past them.
    pub errors: u64,
    /// Gift-card creations that failed; the voucher stays persisted
    /// unbound and is re-attempted while POS keeps reporting it changed.
    pub gift_card_failures: u64,
    /// Gift-card disables that failed; the internal transition stands.
    pub disable_failures: u64,
}

/// Aggregate counts for one paid-order application.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderVoucherStats {
    /// Vouchers created from gift-card purchases on the order.
    pub vouchers_created: u64,
    /// Redemption deltas applied.
    pub redemptions_applied: u64,
    /// Deltas whose order id was already recorded (webhook redelivery).
    pub already_applied: u64,
    /// Deltas clamped to the remaining headroom.
    pub clamped: u64,
    /// Redemptions referencing unknown codes, and closed vouchers.
    pub skipped: u64,
    /// Per-record store failures; the order continued past them.
    pub errors: u64,
}

/// Counts for a single customer webhook event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustomerEventCounts {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
}

impl From<SyncOutcome> for CustomerEventCounts {
    fn from(outcome: SyncOutcome) -> Self {
        match outcome {
            SyncOutcome::Created => Self {
                created: 1,
                ..Self::default()
            },
            SyncOutcome::Updated => Self {
                updated: 1,
                ..Self::default()
            },
        }
    }
}
