//! The canonical customer record and its merge rules.
//!
//! A [`CustomerRecord`] is the internal entity that inbound events from
//! every connected system reconcile against. The merge rules here encode
//! the two non-negotiable behaviors of the engine:
//!
//! - Integration sub-records are replaced wholesale on every sync; they
//!   mirror the external system's current truth.
//! - Profile fields are filled only when empty; an internal edit is never
//!   clobbered by a stale external re-sync.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    AuditAction, AuditEntry, CustomerId, CustomerStatus, Email, RecordSource, SyncStatus,
    VerificationStatus,
};

/// Shopify-side integration state, embedded in the customer record.
///
/// Mirrors what the storefront most recently reported; replaced as a whole
/// on every successful sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ShopifyIntegration {
    /// Numeric Shopify customer id, stored as a string.
    pub shopify_customer_id: Option<String>,
    #[serde(default)]
    pub orders_count: i64,
    #[serde(default)]
    pub total_spent: Decimal,
    pub last_order_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sync_status: SyncStatus,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
}

/// POS-side integration state, embedded in the customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProHandelIntegration {
    /// POS customer id (UUID string).
    pub customer_id: Option<String>,
    /// Human-facing POS customer number.
    pub customer_number: Option<i64>,
    #[serde(default)]
    pub sync_status: SyncStatus,
    pub last_sync_date: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
}

/// Profile fields carried by an inbound event; applied fill-if-empty.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// The canonical internal customer entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    /// Normalized email, the unique natural key.
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Which system first sighted this customer.
    pub source: RecordSource,
    pub status: CustomerStatus,
    pub verification_status: VerificationStatus,
    pub shopify: ShopifyIntegration,
    pub prohandel: ProHandelIntegration,
    /// Append-only; entries are pushed, never edited or removed.
    pub audit_trail: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A customer record about to be inserted; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCustomerRecord {
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub source: RecordSource,
    pub shopify: ShopifyIntegration,
    pub prohandel: ProHandelIntegration,
    pub audit_trail: Vec<AuditEntry>,
}

impl NewCustomerRecord {
    /// Seed a record from a first sighting.
    ///
    /// The matching audit entry (`CREATED_FROM_SHOPIFY` / `CREATED_FROM_POS`)
    /// is appended automatically.
    #[must_use]
    pub fn first_sighting(email: Email, source: RecordSource, at: DateTime<Utc>) -> Self {
        let action = match source {
            RecordSource::Shopify => AuditAction::CreatedFromShopify,
            RecordSource::Pos => AuditAction::CreatedFromPos,
            RecordSource::Manual => AuditAction::CreatedManually,
        };
        Self {
            email,
            first_name: None,
            last_name: None,
            phone: None,
            address: None,
            source,
            shopify: ShopifyIntegration::default(),
            prohandel: ProHandelIntegration::default(),
            audit_trail: vec![AuditEntry::system(action, at, serde_json::Value::Null)],
        }
    }

    /// Set the profile fields in one go.
    #[must_use]
    pub fn with_profile(mut self, patch: ProfilePatch) -> Self {
        self.first_name = patch.first_name;
        self.last_name = patch.last_name;
        self.phone = patch.phone;
        self.address = patch.address;
        self
    }

    /// Set the Shopify integration sub-record.
    #[must_use]
    pub fn with_shopify(mut self, shopify: ShopifyIntegration) -> Self {
        self.shopify = shopify;
        self
    }
}

impl CustomerRecord {
    /// Fill profile fields that are currently empty.
    ///
    /// Populated fields are left untouched: an external re-sync must never
    /// overwrite a value an operator (or an earlier, fresher event) set.
    /// Returns `true` if any field changed.
    pub fn merge_profile(&mut self, patch: &ProfilePatch) -> bool {
        let mut changed = false;
        changed |= fill_if_empty(&mut self.first_name, patch.first_name.as_deref());
        changed |= fill_if_empty(&mut self.last_name, patch.last_name.as_deref());
        changed |= fill_if_empty(&mut self.phone, patch.phone.as_deref());
        changed |= fill_if_empty(&mut self.address, patch.address.as_deref());
        changed
    }

    /// Replace the Shopify integration sub-record with the external
    /// system's current truth.
    pub fn set_shopify_integration(&mut self, shopify: ShopifyIntegration) {
        self.shopify = shopify;
    }

    /// Replace the POS integration sub-record.
    pub fn set_prohandel_integration(&mut self, prohandel: ProHandelIntegration) {
        self.prohandel = prohandel;
    }

    /// Append an audit entry attributed to the sync engine.
    pub fn push_audit(&mut self, action: AuditAction, at: DateTime<Utc>, details: serde_json::Value) {
        self.audit_trail.push(AuditEntry::system(action, at, details));
    }

    /// Flag the Shopify integration for manual review after an identifier
    /// conflict. The bound identifier is deliberately left untouched.
    pub fn flag_shopify_conflict(&mut self, message: &str, at: DateTime<Utc>) {
        self.shopify.sync_status = SyncStatus::ManualReview;
        self.shopify.sync_error = Some(message.to_owned());
        self.push_audit(
            AuditAction::IdentifierConflict,
            at,
            serde_json::json!({ "system": "shopify", "message": message }),
        );
    }
}

/// Set `slot` from `candidate` only when the slot is empty or blank.
fn fill_if_empty(slot: &mut Option<String>, candidate: Option<&str>) -> bool {
    let is_empty = slot.as_deref().is_none_or(|s| s.trim().is_empty());
    match candidate {
        Some(value) if is_empty && !value.trim().is_empty() => {
            *slot = Some(value.to_owned());
            true
        }
        _ => false,
    }
}
