//! Identity resolution: deciding whether an inbound event matches a
//! known record.
//!
//! Matching is strictly exact-key; there is deliberately no fuzzy or
//! probabilistic matching, because a false-positive merge silently mixes
//! two people's data while a duplicate record is visible and fixable.
//! `None` from a resolve is the expected "create" path, not a fault.

use mercurios_core::Email;

use crate::error::SyncError;
use crate::prohandel::PosVoucher;
use crate::shopify::ShopifyCustomer;
use crate::store::{CustomerKeys, VoucherKeys};

/// Normalize the email carried by a source event into the matching key.
///
/// Events without a usable email are refused: nothing else on a customer
/// payload is stable enough to dedupe on, so processing one would risk
/// creating a duplicate on every delivery. The caller logs and counts the
/// skip; it is not retried automatically.
pub fn normalized_email(raw: Option<&str>, who: impl std::fmt::Display) -> Result<Email, SyncError> {
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| SyncError::Unresolvable(format!("no email on {who}")))?;

    Email::parse(raw).map_err(|e| SyncError::Unresolvable(format!("invalid email on {who}: {e}")))
}

/// The normalized email and key set for an inbound Shopify customer
/// event.
///
/// # Errors
///
/// Returns [`SyncError::Unresolvable`] when the event lacks an email.
pub fn customer_keys(event: &ShopifyCustomer) -> Result<(Email, CustomerKeys), SyncError> {
    let email = normalized_email(event.email.as_deref(), format_args!("customer {}", event.id))?;

    let keys = CustomerKeys {
        email: Some(email.clone()),
        shopify_customer_id: Some(event.id.to_string()),
        pos_customer_id: None,
    };
    Ok((email, keys))
}

/// The key set for a changed POS voucher: UUID, number, and the derived
/// storefront code, tried as one disjunction in priority order.
#[must_use]
pub fn pos_voucher_keys(voucher: &PosVoucher) -> VoucherKeys {
    VoucherKeys {
        pos_uuid: Some(voucher.id),
        pos_number: Some(voucher.number),
        code: Some(voucher.storefront_code()),
    }
}
