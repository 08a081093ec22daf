//! `PostgreSQL` implementation of the identity store.
//!
//! Matching columns (email, voucher code, POS number/UUID, external ids
//! inside the JSONB sub-records) carry unique constraints; an insert that
//! loses a race surfaces SQLSTATE 23505, which is mapped to
//! [`StoreError::Conflict`] and handled as control flow by the callers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use uuid::Uuid;

use mercurios_core::{
    CurrencyCode, CustomerId, CustomerRecord, CustomerStatus, Email, NewCustomerRecord,
    NewVoucherRecord, RecordSource, VerificationStatus, VoucherId, VoucherRecord, VoucherStatus,
};

use super::{CustomerKeys, IdentityStore, StoreError, VoucherKeys};

/// Identity store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` customer queries.
#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: i64,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    source: String,
    status: String,
    verification_status: String,
    shopify: serde_json::Value,
    prohandel: serde_json::Value,
    audit_trail: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CustomerRow> for CustomerRecord {
    type Error = StoreError;

    fn try_from(row: CustomerRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            StoreError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: CustomerId::new(row.id),
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            address: row.address,
            source: enum_from_str::<RecordSource>("source", &row.source)?,
            status: enum_from_str::<CustomerStatus>("status", &row.status)?,
            verification_status: enum_from_str::<VerificationStatus>(
                "verification_status",
                &row.verification_status,
            )?,
            shopify: from_document("shopify", row.shopify)?,
            prohandel: from_document("prohandel", row.prohandel)?,
            audit_trail: from_document("audit_trail", row.audit_trail)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for `PostgreSQL` voucher queries.
#[derive(Debug, sqlx::FromRow)]
struct VoucherRow {
    id: i64,
    code: String,
    gift_card_id: Option<String>,
    order_id: Option<String>,
    customer: Option<serde_json::Value>,
    pos_number: Option<i64>,
    pos_uuid: Option<Uuid>,
    value: Decimal,
    initial_value: Decimal,
    currency: String,
    status: String,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    redeemed_at: Option<DateTime<Utc>>,
    redeemed_amount: Decimal,
    applied_orders: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VoucherRow> for VoucherRecord {
    type Error = StoreError;

    fn try_from(row: VoucherRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: VoucherId::new(row.id),
            code: row.code,
            gift_card_id: row.gift_card_id,
            order_id: row.order_id,
            customer: row
                .customer
                .map(|doc| from_document("customer", doc))
                .transpose()?,
            pos_number: row.pos_number,
            pos_uuid: row.pos_uuid,
            value: row.value,
            initial_value: row.initial_value,
            currency: enum_from_str::<CurrencyCode>("currency", &row.currency)?,
            status: enum_from_str::<VoucherStatus>("status", &row.status)?,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            redeemed_at: row.redeemed_at,
            redeemed_amount: row.redeemed_amount,
            applied_orders: from_document("applied_orders", row.applied_orders)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Store implementation
// =============================================================================

impl IdentityStore for PgIdentityStore {
    async fn find_customer(
        &self,
        keys: &CustomerKeys,
    ) -> Result<Option<CustomerRecord>, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            SELECT id, email, first_name, last_name, phone, address,
                   source, status, verification_status,
                   shopify, prohandel, audit_trail,
                   created_at, updated_at
            FROM sync.customer
            WHERE ($1::text IS NOT NULL AND email = $1)
               OR ($2::text IS NOT NULL AND shopify ->> 'shopify_customer_id' = $2)
               OR ($3::text IS NOT NULL AND prohandel ->> 'customer_id' = $3)
            ORDER BY (email = $1) DESC NULLS LAST
            LIMIT 1
            ",
        )
        .bind(keys.email.as_ref().map(Email::as_str))
        .bind(keys.shopify_customer_id.as_deref())
        .bind(keys.pos_customer_id.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_customer(
        &self,
        draft: NewCustomerRecord,
    ) -> Result<CustomerRecord, StoreError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO sync.customer
                (email, first_name, last_name, phone, address, source,
                 shopify, prohandel, audit_trail)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, email, first_name, last_name, phone, address,
                      source, status, verification_status,
                      shopify, prohandel, audit_trail,
                      created_at, updated_at
            ",
        )
        .bind(draft.email.as_str())
        .bind(draft.first_name.as_deref())
        .bind(draft.last_name.as_deref())
        .bind(draft.phone.as_deref())
        .bind(draft.address.as_deref())
        .bind(enum_to_str("source", &draft.source)?)
        .bind(to_document("shopify", &draft.shopify)?)
        .bind(to_document("prohandel", &draft.prohandel)?)
        .bind(to_document("audit_trail", &draft.audit_trail)?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "customer"))?;

        row.try_into()
    }

    async fn save_customer(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE sync.customer
            SET first_name = $2,
                last_name = $3,
                phone = $4,
                address = $5,
                status = $6,
                verification_status = $7,
                shopify = $8,
                prohandel = $9,
                audit_trail = $10,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(record.id.as_i64())
        .bind(record.first_name.as_deref())
        .bind(record.last_name.as_deref())
        .bind(record.phone.as_deref())
        .bind(record.address.as_deref())
        .bind(enum_to_str("status", &record.status)?)
        .bind(enum_to_str("verification_status", &record.verification_status)?)
        .bind(to_document("shopify", &record.shopify)?)
        .bind(to_document("prohandel", &record.prohandel)?)
        .bind(to_document("audit_trail", &record.audit_trail)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_voucher(&self, keys: &VoucherKeys) -> Result<Option<VoucherRecord>, StoreError> {
        let row = sqlx::query_as::<_, VoucherRow>(
            r"
            SELECT id, code, gift_card_id, order_id, customer,
                   pos_number, pos_uuid,
                   value, initial_value, currency, status,
                   issued_at, expires_at, redeemed_at, redeemed_amount,
                   applied_orders, created_at, updated_at
            FROM sync.voucher
            WHERE ($1::uuid IS NOT NULL AND pos_uuid = $1)
               OR ($2::bigint IS NOT NULL AND pos_number = $2)
               OR ($3::text IS NOT NULL AND code = $3)
            ORDER BY (pos_uuid = $1) DESC NULLS LAST,
                     (pos_number = $2) DESC NULLS LAST
            LIMIT 1
            ",
        )
        .bind(keys.pos_uuid)
        .bind(keys.pos_number)
        .bind(keys.code.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert_voucher(&self, draft: NewVoucherRecord) -> Result<VoucherRecord, StoreError> {
        let row = sqlx::query_as::<_, VoucherRow>(
            r"
            INSERT INTO sync.voucher
                (code, gift_card_id, order_id, customer, pos_number, pos_uuid,
                 value, initial_value, currency, status, issued_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, code, gift_card_id, order_id, customer,
                      pos_number, pos_uuid,
                      value, initial_value, currency, status,
                      issued_at, expires_at, redeemed_at, redeemed_amount,
                      applied_orders, created_at, updated_at
            ",
        )
        .bind(&draft.code)
        .bind(draft.gift_card_id.as_deref())
        .bind(draft.order_id.as_deref())
        .bind(
            draft
                .customer
                .as_ref()
                .map(|c| to_document("customer", c))
                .transpose()?,
        )
        .bind(draft.pos_number)
        .bind(draft.pos_uuid)
        .bind(draft.value)
        .bind(draft.initial_value)
        .bind(enum_to_str("currency", &draft.currency)?)
        .bind(enum_to_str("status", &draft.status)?)
        .bind(draft.issued_at)
        .bind(draft.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "voucher"))?;

        row.try_into()
    }

    async fn save_voucher(&self, record: &VoucherRecord) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE sync.voucher
            SET gift_card_id = $2,
                order_id = $3,
                customer = $4,
                pos_number = $5,
                pos_uuid = $6,
                value = $7,
                status = $8,
                redeemed_at = $9,
                redeemed_amount = $10,
                applied_orders = $11,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(record.id.as_i64())
        .bind(record.gift_card_id.as_deref())
        .bind(record.order_id.as_deref())
        .bind(
            record
                .customer
                .as_ref()
                .map(|c| to_document("customer", c))
                .transpose()?,
        )
        .bind(record.pos_number)
        .bind(record.pos_uuid)
        .bind(record.value)
        .bind(enum_to_str("status", &record.status)?)
        .bind(record.redeemed_at)
        .bind(record.redeemed_amount)
        .bind(to_document("applied_orders", &record.applied_orders)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Conversion helpers
// =============================================================================

/// Serialize a unit-variant enum to its wire name (snake_case TEXT column).
fn enum_to_str<T: Serialize>(what: &str, value: &T) -> Result<String, StoreError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => Ok(s),
        Ok(other) => Err(StoreError::DataCorruption(format!(
            "{what} did not serialize to a string: {other}"
        ))),
        Err(e) => Err(StoreError::DataCorruption(format!(
            "{what} serialization failed: {e}"
        ))),
    }
}

/// Parse a TEXT column back into its enum.
fn enum_from_str<T: DeserializeOwned>(what: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_value(serde_json::Value::String(raw.to_owned()))
        .map_err(|e| StoreError::DataCorruption(format!("invalid {what} in database: {e}")))
}

/// Serialize a sub-document for a JSONB column.
fn to_document<T: Serialize>(what: &str, value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value)
        .map_err(|e| StoreError::DataCorruption(format!("{what} serialization failed: {e}")))
}

/// Parse a JSONB column back into its sub-document type.
fn from_document<T: DeserializeOwned>(
    what: &str,
    doc: serde_json::Value,
) -> Result<T, StoreError> {
    serde_json::from_value(doc)
        .map_err(|e| StoreError::DataCorruption(format!("invalid {what} in database: {e}")))
}

/// Map a unique-constraint violation (SQLSTATE 23505) to the `Conflict`
/// control-flow signal; pass every other error through.
fn map_unique_violation(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::Conflict(format!(
                "{what} violates {}",
                db.constraint().unwrap_or("a unique constraint")
            ))
        }
        _ => StoreError::Database(err),
    }
}
