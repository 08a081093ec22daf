//! The sync engine facade.
//!
//! One explicitly constructed [`SyncEngine`] owns the store handle and
//! both gateway clients for the process lifetime; callers (webhook
//! handlers, schedulers, the CLI) invoke one of the four operations and
//! always get a [`SyncReport`] back - every failure is caught at this
//! boundary and converted into a structured result, nothing throws past
//! it.

use serde::Serialize;
use tracing::{error, instrument, warn};

use crate::error::SyncError;
use crate::prohandel::PosGateway;
use crate::reconcile::{
    CustomerBatchStats, CustomerEventCounts, CustomerReconciler, OrderVoucherStats,
    VoucherReconciler, VoucherSyncStats,
};
use crate::shopify::{
    StorefrontGateway,
    types::{OrderEvent, ShopifyCustomer, WebhookEvent},
};
use crate::store::IdentityStore;

/// Structured result returned by every engine operation.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> SyncReport<T> {
    fn ok(counts: T) -> Self {
        Self {
            success: true,
            counts: Some(counts),
            error: None,
        }
    }

    fn failed(error: &SyncError) -> Self {
        Self {
            success: false,
            counts: None,
            error: Some(error.to_string()),
        }
    }
}

/// The reconciliation engine.
///
/// Construct once at process start with an opened store handle and both
/// gateway clients, and reuse it; the engine itself holds no per-run
/// state.
pub struct SyncEngine<S, SF, P> {
    store: S,
    storefront: SF,
    pos: P,
    lookback: chrono::Duration,
}

impl<S, SF, P> SyncEngine<S, SF, P>
where
    S: IdentityStore,
    SF: StorefrontGateway,
    P: PosGateway,
{
    #[must_use]
    pub const fn new(store: S, storefront: SF, pos: P, lookback: chrono::Duration) -> Self {
        Self {
            store,
            storefront,
            pos,
            lookback,
        }
    }

    /// Reconcile a single customer webhook delivery.
    ///
    /// Events without a usable email are reported as successfully
    /// skipped: they are an accepted outcome, logged and counted, and a
    /// redelivery would change nothing.
    #[instrument(skip_all, fields(topic = %event.topic, shop = %event.shop))]
    pub async fn reconcile_customer_event(
        &self,
        event: &WebhookEvent,
    ) -> SyncReport<CustomerEventCounts> {
        match self.customer_event_inner(event).await {
            Ok(counts) => SyncReport::ok(counts),
            Err(e) => {
                error!(%e, "customer event failed");
                SyncReport::failed(&e)
            }
        }
    }

    async fn customer_event_inner(
        &self,
        event: &WebhookEvent,
    ) -> Result<CustomerEventCounts, SyncError> {
        if !event.topic.starts_with("customers/") {
            return Err(SyncError::MalformedEvent(format!(
                "not a customer topic: {}",
                event.topic
            )));
        }

        let customer: ShopifyCustomer = serde_json::from_value(event.payload.clone())
            .map_err(|e| SyncError::MalformedEvent(format!("customer payload: {e}")))?;

        let reconciler = CustomerReconciler::new(&self.store);
        match reconciler.reconcile_one(&customer).await {
            Ok(outcome) => Ok(outcome.into()),
            Err(e @ SyncError::Unresolvable(_)) => {
                warn!(%e, "skipping customer event");
                Ok(CustomerEventCounts {
                    skipped: 1,
                    ..CustomerEventCounts::default()
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Reconcile every customer the storefront reports, page by page.
    #[instrument(skip_all)]
    pub async fn reconcile_customer_batch(&self) -> SyncReport<CustomerBatchStats> {
        let reconciler = CustomerReconciler::new(&self.store);
        match reconciler.reconcile_batch(&self.storefront).await {
            Ok(stats) => SyncReport::ok(stats),
            Err(e) => {
                error!(%e, "customer batch aborted");
                SyncReport::failed(&e)
            }
        }
    }

    /// One POS poll cycle: voucher issuance plus redemption sync.
    #[instrument(skip_all)]
    pub async fn reconcile_voucher_issuance_and_redemption(&self) -> SyncReport<VoucherSyncStats> {
        let reconciler =
            VoucherReconciler::new(&self.store, &self.storefront, &self.pos, self.lookback);
        match reconciler.sync_pos_changes().await {
            Ok(stats) => SyncReport::ok(stats),
            Err(e) => {
                error!(%e, "POS voucher sync aborted");
                SyncReport::failed(&e)
            }
        }
    }

    /// Apply the voucher purchases and redemptions on one paid order.
    #[instrument(skip_all, fields(order_id = order.id))]
    pub async fn reconcile_order_vouchers(&self, order: &OrderEvent) -> SyncReport<OrderVoucherStats> {
        let reconciler =
            VoucherReconciler::new(&self.store, &self.storefront, &self.pos, self.lookback);
        match reconciler.apply_order(order).await {
            Ok(stats) => SyncReport::ok(stats),
            Err(e) => {
                error!(%e, "order voucher reconciliation failed");
                SyncReport::failed(&e)
            }
        }
    }
}
