//! The voucher record and its monotonic transition rules.
//!
//! A [`VoucherRecord`] tracks one gift instrument across both sides: the
//! POS voucher (numeric id + UUID) and the storefront gift card (code +
//! gift card id). Either side may be known first. All value arithmetic and
//! status transitions live here so the invariants hold no matter which
//! reconciliation direction applies them:
//!
//! - `redeemed_amount` never exceeds `initial_value` (deltas are clamped).
//! - Status never regresses; terminal statuses accept no transition.
//! - Each order's redemption delta is applied at most once, keyed by the
//!   order id recorded in `applied_orders`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{CurrencyCode, VoucherId, VoucherStatus};

/// Point-in-time copy of the buyer, taken when a voucher is purchased
/// online. Deliberately a snapshot, not a live reference: it exists for
/// receipts and lookups, and must not drift when the customer record is
/// later edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub shopify_id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Result of applying one order's redemption delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionOutcome {
    /// The delta was applied. `clamped` is set when the requested amount
    /// would have pushed `redeemed_amount` past `initial_value` and was
    /// reduced to fit.
    Applied {
        status: VoucherStatus,
        clamped: bool,
    },
    /// This order's contribution is already reflected; nothing changed.
    AlreadyApplied,
    /// The voucher is in a terminal status; nothing changed.
    AlreadyClosed,
}

/// One gift voucher/card, tracked across POS and storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoucherRecord {
    pub id: VoucherId,
    /// Storefront code; unique and always present.
    pub code: String,
    /// Shopify gift card binding, once created.
    pub gift_card_id: Option<String>,
    /// Originating storefront order, for vouchers purchased online.
    pub order_id: Option<String>,
    pub customer: Option<CustomerSnapshot>,
    /// POS voucher number; unique when present.
    pub pos_number: Option<i64>,
    /// POS voucher UUID; unique when present.
    pub pos_uuid: Option<Uuid>,
    /// Remaining value.
    pub value: Decimal,
    /// Face value at issuance; immutable once set.
    pub initial_value: Decimal,
    pub currency: CurrencyCode,
    pub status: VoucherStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_amount: Decimal,
    /// Order ids whose redemption delta has been applied; the redelivery
    /// guard for at-least-once webhook delivery.
    #[serde(default)]
    pub applied_orders: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A voucher about to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewVoucherRecord {
    pub code: String,
    pub gift_card_id: Option<String>,
    pub order_id: Option<String>,
    pub customer: Option<CustomerSnapshot>,
    pub pos_number: Option<i64>,
    pub pos_uuid: Option<Uuid>,
    pub value: Decimal,
    pub initial_value: Decimal,
    pub currency: CurrencyCode,
    pub status: VoucherStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewVoucherRecord {
    /// A freshly issued voucher: active, untouched value.
    #[must_use]
    pub fn issued(code: String, value: Decimal, currency: CurrencyCode, issued_at: DateTime<Utc>) -> Self {
        Self {
            code,
            gift_card_id: None,
            order_id: None,
            customer: None,
            pos_number: None,
            pos_uuid: None,
            value,
            initial_value: value,
            currency,
            status: VoucherStatus::Active,
            issued_at,
            expires_at: None,
        }
    }

    /// Attach the POS identity.
    #[must_use]
    pub fn with_pos_identity(mut self, uuid: Uuid, number: i64) -> Self {
        self.pos_uuid = Some(uuid);
        self.pos_number = Some(number);
        self
    }

    /// Attach the originating order and buyer snapshot.
    #[must_use]
    pub fn with_order(mut self, order_id: String, customer: Option<CustomerSnapshot>) -> Self {
        self.order_id = Some(order_id);
        self.customer = customer;
        self
    }
}

impl VoucherRecord {
    /// Mark the voucher fully redeemed, as confirmed by the POS.
    ///
    /// Returns `false` (and changes nothing) when the voucher is already
    /// in a terminal status - the idempotence guard against the same POS
    /// change event arriving in overlapping poll windows.
    pub fn redeem_in_full(&mut self, at: DateTime<Utc>) -> bool {
        if !self.status.can_advance_to(VoucherStatus::Redeemed) {
            return false;
        }
        self.status = VoucherStatus::Redeemed;
        self.redeemed_at = Some(at);
        self.redeemed_amount = self.initial_value;
        self.value = Decimal::ZERO;
        true
    }

    /// Apply one order's redemption delta.
    ///
    /// The order id is the reconciliation key: a delta is applied at most
    /// once per order, so redelivered webhooks are no-ops. Deltas that
    /// would exceed `initial_value` are clamped, reported via
    /// [`RedemptionOutcome::Applied`] `clamped`, and never fail the order.
    pub fn apply_order_redemption(
        &mut self,
        order_id: &str,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> RedemptionOutcome {
        if self.applied_orders.iter().any(|id| id == order_id) {
            return RedemptionOutcome::AlreadyApplied;
        }
        if self.status.is_terminal() {
            return RedemptionOutcome::AlreadyClosed;
        }

        let headroom = self.initial_value - self.redeemed_amount;
        let clamped = amount > headroom;
        let delta = if clamped { headroom } else { amount };

        self.redeemed_amount += delta;
        self.value = self.initial_value - self.redeemed_amount;
        self.applied_orders.push(order_id.to_owned());

        if self.redeemed_amount >= self.initial_value {
            self.status = VoucherStatus::Redeemed;
            self.redeemed_at = Some(at);
        } else {
            self.status = VoucherStatus::Partial;
        }

        RedemptionOutcome::Applied {
            status: self.status,
            clamped,
        }
    }

    /// Bind the storefront gift card created for this voucher.
    pub fn bind_gift_card(&mut self, gift_card_id: String) {
        self.gift_card_id = Some(gift_card_id);
    }
}
