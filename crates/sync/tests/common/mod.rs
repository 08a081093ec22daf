//! Shared fakes for reconciler tests: an in-memory identity store and
//! scriptable gateway doubles.
//!
//! The fakes enforce the same contracts as production: unique keys reject
//! duplicate inserts with `StoreError::Conflict`, lookups are disjunctive
//! with the documented priority, and failure flags let tests inject
//! transient gateway errors.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rust_decimal::Decimal;

use mercurios_core::{CustomerId, CustomerRecord, CustomerStatus, NewCustomerRecord,
    NewVoucherRecord, VerificationStatus, VoucherId, VoucherRecord};
use mercurios_sync::prohandel::{PosGateway, PosRedemption, PosVoucher, ProHandelError};
use mercurios_sync::shopify::{
    CustomerPage, ShopifyCustomer, ShopifyError, StorefrontGateway,
};
use mercurios_sync::store::{CustomerKeys, IdentityStore, StoreError, VoucherKeys};

// =============================================================================
// In-memory identity store
// =============================================================================

#[derive(Default)]
struct MemoryStoreInner {
    customers: Vec<CustomerRecord>,
    vouchers: Vec<VoucherRecord>,
    next_customer_id: i64,
    next_voucher_id: i64,
}

/// In-memory store honoring the unique-key contract.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
    /// When set, the next `find_customer` misses; simulates the race
    /// where a concurrent writer inserts between lookup and insert.
    miss_next_customer_find: Arc<AtomicBool>,
    /// Emails whose persistence calls fail with a database error.
    failing_emails: Arc<Mutex<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next customer lookup miss, as if a concurrent delivery
    /// raced this one.
    pub fn miss_next_customer_find(&self) {
        self.miss_next_customer_find.store(true, Ordering::SeqCst);
    }

    /// Fail persistence for a given email with a database error.
    pub fn fail_persistence_for(&self, email: &str) {
        self.failing_emails.lock().unwrap().push(email.to_owned());
    }

    pub fn customer_count(&self) -> usize {
        self.inner.lock().unwrap().customers.len()
    }

    pub fn voucher_count(&self) -> usize {
        self.inner.lock().unwrap().vouchers.len()
    }

    pub fn customer_by_email(&self, email: &str) -> Option<CustomerRecord> {
        self.inner
            .lock()
            .unwrap()
            .customers
            .iter()
            .find(|c| c.email.as_str() == email)
            .cloned()
    }

    pub fn voucher_by_code(&self, code: &str) -> Option<VoucherRecord> {
        self.inner
            .lock()
            .unwrap()
            .vouchers
            .iter()
            .find(|v| v.code == code)
            .cloned()
    }

    /// Seed a voucher directly, bypassing the reconcilers.
    pub fn seed_voucher(&self, draft: NewVoucherRecord) -> VoucherRecord {
        let mut inner = self.inner.lock().unwrap();
        inner.next_voucher_id += 1;
        let now = Utc::now();
        let record = VoucherRecord {
            id: VoucherId::new(inner.next_voucher_id),
            code: draft.code,
            gift_card_id: draft.gift_card_id,
            order_id: draft.order_id,
            customer: draft.customer,
            pos_number: draft.pos_number,
            pos_uuid: draft.pos_uuid,
            value: draft.value,
            initial_value: draft.initial_value,
            currency: draft.currency,
            status: draft.status,
            issued_at: draft.issued_at,
            expires_at: draft.expires_at,
            redeemed_at: None,
            redeemed_amount: Decimal::ZERO,
            applied_orders: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        inner.vouchers.push(record.clone());
        record
    }

    fn check_failing(&self, email: &str) -> Result<(), StoreError> {
        if self
            .failing_emails
            .lock()
            .unwrap()
            .iter()
            .any(|e| e == email)
        {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl IdentityStore for MemoryStore {
    async fn find_customer(
        &self,
        keys: &CustomerKeys,
    ) -> Result<Option<CustomerRecord>, StoreError> {
        if self.miss_next_customer_find.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }

        let inner = self.inner.lock().unwrap();

        // Email priority first, then external identifiers.
        if let Some(email) = &keys.email
            && let Some(found) = inner
                .customers
                .iter()
                .find(|c| c.email.as_str() == email.as_str())
        {
            return Ok(Some(found.clone()));
        }
        if let Some(id) = &keys.shopify_customer_id
            && let Some(found) = inner
                .customers
                .iter()
                .find(|c| c.shopify.shopify_customer_id.as_deref() == Some(id))
        {
            return Ok(Some(found.clone()));
        }
        if let Some(id) = &keys.pos_customer_id
            && let Some(found) = inner
                .customers
                .iter()
                .find(|c| c.prohandel.customer_id.as_deref() == Some(id))
        {
            return Ok(Some(found.clone()));
        }

        Ok(None)
    }

    async fn insert_customer(
        &self,
        draft: NewCustomerRecord,
    ) -> Result<CustomerRecord, StoreError> {
        self.check_failing(draft.email.as_str())?;

        let mut inner = self.inner.lock().unwrap();

        if inner
            .customers
            .iter()
            .any(|c| c.email.as_str() == draft.email.as_str())
        {
            return Err(StoreError::Conflict("customer_email_key".to_owned()));
        }

        inner.next_customer_id += 1;
        let now = Utc::now();
        let record = CustomerRecord {
            id: CustomerId::new(inner.next_customer_id),
            email: draft.email,
            first_name: draft.first_name,
            last_name: draft.last_name,
            phone: draft.phone,
            address: draft.address,
            source: draft.source,
            status: CustomerStatus::Active,
            verification_status: VerificationStatus::Pending,
            shopify: draft.shopify,
            prohandel: draft.prohandel,
            audit_trail: draft.audit_trail,
            created_at: now,
            updated_at: now,
        };
        inner.customers.push(record.clone());
        Ok(record)
    }

    async fn save_customer(&self, record: &CustomerRecord) -> Result<(), StoreError> {
        self.check_failing(record.email.as_str())?;

        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.customers.iter_mut().find(|c| c.id == record.id) {
            *slot = record.clone();
            slot.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_voucher(&self, keys: &VoucherKeys) -> Result<Option<VoucherRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();

        // POS UUID priority, then POS number, then code.
        if let Some(uuid) = keys.pos_uuid
            && let Some(found) = inner.vouchers.iter().find(|v| v.pos_uuid == Some(uuid))
        {
            return Ok(Some(found.clone()));
        }
        if let Some(number) = keys.pos_number
            && let Some(found) = inner.vouchers.iter().find(|v| v.pos_number == Some(number))
        {
            return Ok(Some(found.clone()));
        }
        if let Some(code) = &keys.code
            && let Some(found) = inner.vouchers.iter().find(|v| &v.code == code)
        {
            return Ok(Some(found.clone()));
        }

        Ok(None)
    }

    async fn insert_voucher(&self, draft: NewVoucherRecord) -> Result<VoucherRecord, StoreError> {
        {
            let inner = self.inner.lock().unwrap();
            if inner.vouchers.iter().any(|v| v.code == draft.code) {
                return Err(StoreError::Conflict("voucher_code_key".to_owned()));
            }
            if draft.pos_number.is_some()
                && inner
                    .vouchers
                    .iter()
                    .any(|v| v.pos_number == draft.pos_number)
            {
                return Err(StoreError::Conflict("voucher_pos_number_key".to_owned()));
            }
            if draft.pos_uuid.is_some()
                && inner.vouchers.iter().any(|v| v.pos_uuid == draft.pos_uuid)
            {
                return Err(StoreError::Conflict("voucher_pos_uuid_key".to_owned()));
            }
        }
        Ok(self.seed_voucher(draft))
    }

    async fn save_voucher(&self, record: &VoucherRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.vouchers.iter_mut().find(|v| v.id == record.id) {
            *slot = record.clone();
            slot.updated_at = Utc::now();
        }
        Ok(())
    }
}

// =============================================================================
// Storefront gateway double
// =============================================================================

#[derive(Default)]
struct MockStorefrontInner {
    pages: Vec<Vec<ShopifyCustomer>>,
    created_gift_cards: Vec<(String, Decimal, String)>,
    disabled_gift_cards: Vec<String>,
}

/// Scriptable storefront gateway.
#[derive(Clone, Default)]
pub struct MockStorefront {
    inner: Arc<Mutex<MockStorefrontInner>>,
    next_gift_card_id: Arc<AtomicU64>,
    /// Page index whose fetch fails, if any.
    fail_page: Arc<Mutex<Option<usize>>>,
    fail_gift_card_create: Arc<AtomicBool>,
    fail_gift_card_disable: Arc<AtomicBool>,
}

impl MockStorefront {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(pages: Vec<Vec<ShopifyCustomer>>) -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().pages = pages;
        mock
    }

    pub fn fail_page_fetch(&self, page_index: usize) {
        *self.fail_page.lock().unwrap() = Some(page_index);
    }

    pub fn fail_gift_card_create(&self) {
        self.fail_gift_card_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_gift_card_disable(&self) {
        self.fail_gift_card_disable.store(true, Ordering::SeqCst);
    }

    pub fn created_gift_cards(&self) -> Vec<(String, Decimal, String)> {
        self.inner.lock().unwrap().created_gift_cards.clone()
    }

    pub fn disabled_gift_cards(&self) -> Vec<String> {
        self.inner.lock().unwrap().disabled_gift_cards.clone()
    }
}

impl StorefrontGateway for MockStorefront {
    async fn list_customers(
        &self,
        page_token: Option<&str>,
    ) -> Result<CustomerPage, ShopifyError> {
        let index = page_token.map_or(0, |t| t.parse::<usize>().unwrap());

        if *self.fail_page.lock().unwrap() == Some(index) {
            return Err(ShopifyError::Api {
                status: 500,
                message: "page fetch failed".to_owned(),
            });
        }

        let inner = self.inner.lock().unwrap();
        let customers = inner.pages.get(index).cloned().unwrap_or_default();
        let next_page_token = (index + 1 < inner.pages.len()).then(|| (index + 1).to_string());

        Ok(CustomerPage {
            customers,
            next_page_token,
        })
    }

    async fn create_gift_card(
        &self,
        code: &str,
        initial_value: Decimal,
        note: &str,
    ) -> Result<String, ShopifyError> {
        if self.fail_gift_card_create.load(Ordering::SeqCst) {
            return Err(ShopifyError::Api {
                status: 502,
                message: "gift card create failed".to_owned(),
            });
        }

        self.inner.lock().unwrap().created_gift_cards.push((
            code.to_owned(),
            initial_value,
            note.to_owned(),
        ));
        let id = self.next_gift_card_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("gc-{id}"))
    }

    async fn disable_gift_card(&self, gift_card_id: &str) -> Result<(), ShopifyError> {
        if self.fail_gift_card_disable.load(Ordering::SeqCst) {
            return Err(ShopifyError::Api {
                status: 502,
                message: "gift card disable failed".to_owned(),
            });
        }

        self.inner
            .lock()
            .unwrap()
            .disabled_gift_cards
            .push(gift_card_id.to_owned());
        Ok(())
    }
}

// =============================================================================
// POS gateway double
// =============================================================================

#[derive(Default)]
struct MockPosInner {
    vouchers: Vec<PosVoucher>,
    redemptions: Vec<PosRedemption>,
}

/// Scriptable POS gateway.
#[derive(Clone, Default)]
pub struct MockPos {
    inner: Arc<Mutex<MockPosInner>>,
    fail_vouchers: Arc<AtomicBool>,
    fail_redemptions: Arc<AtomicBool>,
}

impl MockPos {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report_voucher(&self, voucher: PosVoucher) {
        self.inner.lock().unwrap().vouchers.push(voucher);
    }

    pub fn report_redemption(&self, redemption: PosRedemption) {
        self.inner.lock().unwrap().redemptions.push(redemption);
    }

    pub fn fail_voucher_fetch(&self) {
        self.fail_vouchers.store(true, Ordering::SeqCst);
    }

    pub fn fail_redemption_fetch(&self) {
        self.fail_redemptions.store(true, Ordering::SeqCst);
    }
}

impl PosGateway for MockPos {
    async fn vouchers_changed_since(
        &self,
        _since: chrono::DateTime<Utc>,
    ) -> Result<Vec<PosVoucher>, ProHandelError> {
        if self.fail_vouchers.load(Ordering::SeqCst) {
            return Err(ProHandelError::Api {
                status: 503,
                message: "voucher feed unavailable".to_owned(),
            });
        }
        Ok(self.inner.lock().unwrap().vouchers.clone())
    }

    async fn redemptions_changed_since(
        &self,
        _since: chrono::DateTime<Utc>,
    ) -> Result<Vec<PosRedemption>, ProHandelError> {
        if self.fail_redemptions.load(Ordering::SeqCst) {
            return Err(ProHandelError::Api {
                status: 503,
                message: "redemption feed unavailable".to_owned(),
            });
        }
        Ok(self.inner.lock().unwrap().redemptions.clone())
    }
}

// =============================================================================
// Payload builders
// =============================================================================

/// A REST-shaped customer payload.
pub fn shopify_customer(id: i64, email: Option<&str>) -> ShopifyCustomer {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "email": email,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "orders_count": 1,
        "total_spent": "50.00",
        "tags": "vip"
    }))
    .unwrap()
}

/// A POS voucher as the changed feed reports it.
pub fn pos_voucher(uuid: &str, number: i64, value: Decimal) -> PosVoucher {
    serde_json::from_value(serde_json::json!({
        "id": uuid,
        "number": number,
        "value": value,
    }))
    .unwrap()
}

/// A POS redemption event.
pub fn pos_redemption(uuid: &str, date: &str) -> PosRedemption {
    serde_json::from_value(serde_json::json!({
        "id": uuid,
        "voucherRedemptionDate": date,
    }))
    .unwrap()
}
