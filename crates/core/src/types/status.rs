//! Status enums for the sync domain.
//!
//! Each integration sub-record carries its own [`SyncStatus`] state
//! machine; vouchers carry a monotonic [`VoucherStatus`] lifecycle.

use serde::{Deserialize, Serialize};

/// Per-integration sync state.
///
/// Every external system gets its own independent `SyncStatus` on the
/// customer record, so a ProHandel failure never masks a successful
/// Shopify sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Not yet synced with the external system.
    #[default]
    Pending,
    /// Last sync attempt succeeded.
    Synced,
    /// Last sync attempt failed; `sync_error` holds the reason.
    Error,
    /// An identifier conflict was detected; an operator must resolve it.
    ManualReview,
}

/// Voucher lifecycle status.
///
/// Transitions are monotonic: a voucher advances
/// `active -> partial -> redeemed` and never moves backward. `cancelled`
/// and `expired` are terminal alternatives to redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Issued and fully unspent.
    #[default]
    Active,
    /// Partially spent; `redeemed_amount` tracks how much.
    Partial,
    /// Fully spent.
    Redeemed,
    /// Voided before full redemption.
    Cancelled,
    /// Past its expiry date.
    Expired,
}

impl VoucherStatus {
    /// Whether this status accepts no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Redeemed | Self::Cancelled | Self::Expired)
    }

    /// Position in the monotonic lifecycle; transitions may only increase it.
    const fn rank(self) -> u8 {
        match self {
            Self::Active => 0,
            Self::Partial => 1,
            Self::Redeemed | Self::Cancelled | Self::Expired => 2,
        }
    }

    /// Whether a transition from `self` to `next` is a legal advance.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        !self.is_terminal() && self.rank() < next.rank()
    }
}

impl std::fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Partial => "partial",
            Self::Redeemed => "redeemed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        };
        f.write_str(s)
    }
}

/// Customer account status. Records are never hard-deleted, only flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

/// Identity verification status, unrelated to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Pending,
    Processing,
    Approved,
    Declined,
}

/// Which system first sighted a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    Shopify,
    Pos,
    Manual,
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Shopify => "shopify",
            Self::Pos => "pos",
            Self::Manual => "manual",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voucher_status_advances_forward() {
        assert!(VoucherStatus::Active.can_advance_to(VoucherStatus::Partial));
        assert!(VoucherStatus::Active.can_advance_to(VoucherStatus::Redeemed));
        assert!(VoucherStatus::Active.can_advance_to(VoucherStatus::Cancelled));
        assert!(VoucherStatus::Partial.can_advance_to(VoucherStatus::Redeemed));
        assert!(VoucherStatus::Partial.can_advance_to(VoucherStatus::Expired));
    }

    #[test]
    fn test_voucher_status_never_regresses() {
        assert!(!VoucherStatus::Redeemed.can_advance_to(VoucherStatus::Active));
        assert!(!VoucherStatus::Redeemed.can_advance_to(VoucherStatus::Partial));
        assert!(!VoucherStatus::Partial.can_advance_to(VoucherStatus::Active));
        assert!(!VoucherStatus::Cancelled.can_advance_to(VoucherStatus::Redeemed));
        assert!(!VoucherStatus::Expired.can_advance_to(VoucherStatus::Active));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(VoucherStatus::Redeemed.is_terminal());
        assert!(VoucherStatus::Cancelled.is_terminal());
        assert!(VoucherStatus::Expired.is_terminal());
        assert!(!VoucherStatus::Active.is_terminal());
        assert!(!VoucherStatus::Partial.is_terminal());
    }

    #[test]
    fn test_sync_status_serde_names() {
        let json = serde_json::to_string(&SyncStatus::ManualReview).unwrap();
        assert_eq!(json, "\"manual_review\"");
    }
}
