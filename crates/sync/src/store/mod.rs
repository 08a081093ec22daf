//! The identity store: durable home of customer and voucher records.
//!
//! # Contract
//!
//! The store is a document store offering find / insert / save with
//! unique-key constraints. Reconcilers never do find-then-insert: inserts
//! are atomic and reject duplicates with [`StoreError::Conflict`], which
//! callers treat as "already exists, retry as update". This closes the
//! race window between two webhook deliveries for the same entity and
//! between a poll cycle and a webhook.
//!
//! # Tables (`PostgreSQL` implementation)
//!
//! - `sync.customer` - canonical customers; unique normalized email;
//!   integration sub-records and the audit trail as JSONB documents
//! - `sync.voucher` - gift vouchers; unique storefront code, unique POS
//!   number and UUID when present
//!
//! # Migrations
//!
//! Migrations are stored in `crates/sync/migrations/` and run via:
//! ```bash
//! cargo run -p mercurios-cli -- migrate
//! ```

pub mod postgres;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use uuid::Uuid;

use mercurios_core::{
    CustomerRecord, Email, NewCustomerRecord, NewVoucherRecord, VoucherRecord,
};

pub use postgres::PgIdentityStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Unique-constraint violation on insert (e.g., duplicate email or
    /// voucher code). Expected under concurrent writers; callers fall
    /// back to the update path.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Whether the failure is transient (retry-safe, nothing persisted).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Key set for the disjunctive customer lookup.
///
/// Priority is fixed: exact normalized-email match first, then exact
/// external-identifier match. No fuzzy matching - a false-positive merge
/// is worse than a duplicate.
#[derive(Debug, Clone, Default)]
pub struct CustomerKeys {
    pub email: Option<Email>,
    pub shopify_customer_id: Option<String>,
    pub pos_customer_id: Option<String>,
}

/// Key set for the disjunctive voucher lookup.
///
/// Priority is fixed: POS UUID, then POS number, then storefront code.
#[derive(Debug, Clone, Default)]
pub struct VoucherKeys {
    pub pos_uuid: Option<Uuid>,
    pub pos_number: Option<i64>,
    pub code: Option<String>,
}

impl VoucherKeys {
    /// Keys matching a POS redemption event, which identifies the voucher
    /// by UUID only.
    #[must_use]
    pub const fn pos_uuid(uuid: Uuid) -> Self {
        Self {
            pos_uuid: Some(uuid),
            pos_number: None,
            code: None,
        }
    }

    /// Keys matching a storefront code only.
    #[must_use]
    pub const fn code(code: String) -> Self {
        Self {
            pos_uuid: None,
            pos_number: None,
            code: Some(code),
        }
    }
}

/// Document-store contract the reconcilers depend on.
///
/// Implemented by [`PgIdentityStore`] in production and by in-memory
/// fakes in tests.
#[allow(async_fn_in_trait)]
pub trait IdentityStore {
    /// Find a customer by the key set, as one disjunctive lookup with
    /// email priority. `None` is the expected "create" path.
    async fn find_customer(&self, keys: &CustomerKeys)
    -> Result<Option<CustomerRecord>, StoreError>;

    /// Insert a new customer. Rejects a duplicate email with
    /// [`StoreError::Conflict`].
    async fn insert_customer(&self, draft: NewCustomerRecord)
    -> Result<CustomerRecord, StoreError>;

    /// Persist the full state of an existing customer record.
    async fn save_customer(&self, record: &CustomerRecord) -> Result<(), StoreError>;

    /// Find a voucher by the key set, as one disjunctive lookup with
    /// POS-UUID priority.
    async fn find_voucher(&self, keys: &VoucherKeys) -> Result<Option<VoucherRecord>, StoreError>;

    /// Insert a new voucher. Rejects a duplicate code, POS number, or POS
    /// UUID with [`StoreError::Conflict`].
    async fn insert_voucher(&self, draft: NewVoucherRecord) -> Result<VoucherRecord, StoreError>;

    /// Persist the full state of an existing voucher record.
    async fn save_voucher(&self, record: &VoucherRecord) -> Result<(), StoreError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// Open the pool once at process start and pass the resulting store
/// handle into the engine; it is reused for the process lifetime and
/// never re-opened per call.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// The embedded migrator for the sync schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
