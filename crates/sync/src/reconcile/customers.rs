//! Customer reconciliation: resolve, merge-or-create, persist, audit.

use chrono::{DateTime, Utc};
use tracing::{debug, error, instrument, warn};

use mercurios_core::{CustomerRecord, NewCustomerRecord, RecordSource};

use crate::error::SyncError;
use crate::shopify::{ShopifyCustomer, StorefrontGateway};
use crate::store::{CustomerKeys, IdentityStore, StoreError};

use super::{CustomerBatchStats, SyncOutcome, resolver};

/// Reconciles inbound customer events against the identity store.
///
/// Holds only borrowed handles; construct one per invocation.
pub struct CustomerReconciler<'a, S> {
    store: &'a S,
}

impl<'a, S: IdentityStore> CustomerReconciler<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Reconcile a single inbound customer.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Unresolvable`] when the event has no usable email;
    ///   callers skip and count it.
    /// - [`SyncError::IdentifierConflict`] when the matched record is
    ///   bound to a different Shopify id; the record is flagged for
    ///   manual review before the error is returned.
    /// - [`SyncError::Store`] on persistence failure.
    #[instrument(skip(self, source), fields(shopify_id = source.id))]
    pub async fn reconcile_one(&self, source: &ShopifyCustomer) -> Result<SyncOutcome, SyncError> {
        let (email, keys) = resolver::customer_keys(source)?;
        let now = Utc::now();

        match self.store.find_customer(&keys).await? {
            Some(record) => {
                self.update_existing(record, source, now).await?;
                Ok(SyncOutcome::Updated)
            }
            None => {
                let draft = NewCustomerRecord::first_sighting(email, RecordSource::Shopify, now)
                    .with_profile(source.profile_patch())
                    .with_shopify(source.integration(now));

                match self.store.insert_customer(draft).await {
                    Ok(_) => Ok(SyncOutcome::Created),
                    Err(StoreError::Conflict(reason)) => {
                        // A concurrent delivery created the record between
                        // our lookup and the insert; fall back to update.
                        debug!(%reason, "create lost a race, retrying as update");
                        self.retry_as_update(&keys, source, now).await
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn update_existing(
        &self,
        mut record: CustomerRecord,
        source: &ShopifyCustomer,
        now: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        let event_id = source.id.to_string();

        // An identifier, once bound, must keep resolving to this record.
        // A mismatch means the same email now maps to a different Shopify
        // customer: no merge policy is safe to guess, so flag and stop.
        if let Some(bound) = record.shopify.shopify_customer_id.as_deref()
            && bound != event_id
        {
            let message = format!(
                "record {} is bound to shopify id {bound}, event carried {event_id}",
                record.id
            );
            warn!(%message, "identifier conflict; flagging for manual review");
            record.flag_shopify_conflict(&message, now);
            self.store.save_customer(&record).await?;
            return Err(SyncError::IdentifierConflict(message));
        }

        // Integration fields mirror the external system's current truth;
        // profile fields only fill gaps.
        record.set_shopify_integration(source.integration(now));
        record.merge_profile(&source.profile_patch());
        self.store.save_customer(&record).await?;
        Ok(())
    }

    async fn retry_as_update(
        &self,
        keys: &CustomerKeys,
        source: &ShopifyCustomer,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome, SyncError> {
        match self.store.find_customer(keys).await? {
            Some(record) => {
                self.update_existing(record, source, now).await?;
                Ok(SyncOutcome::Updated)
            }
            // Insert said duplicate but the lookup finds nothing: records
            // are never deleted, so this points at the store itself.
            None => Err(SyncError::Store(StoreError::DataCorruption(format!(
                "duplicate reported for {keys:?} but no record resolves"
            )))),
        }
    }

    /// Page through the storefront and reconcile every customer.
    ///
    /// Per-record failures are logged and counted without stopping the
    /// batch; a page fetch failure aborts the run and surfaces.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storefront`] when a page fetch fails.
    #[instrument(skip_all)]
    pub async fn reconcile_batch<G: StorefrontGateway>(
        &self,
        storefront: &G,
    ) -> Result<CustomerBatchStats, SyncError> {
        let mut stats = CustomerBatchStats::default();
        let mut page_token: Option<String> = None;

        loop {
            let page = storefront.list_customers(page_token.as_deref()).await?;

            for customer in &page.customers {
                match self.reconcile_one(customer).await {
                    Ok(SyncOutcome::Created) => {
                        stats.processed += 1;
                        stats.created += 1;
                    }
                    Ok(SyncOutcome::Updated) => {
                        stats.processed += 1;
                        stats.updated += 1;
                    }
                    Err(e @ SyncError::Unresolvable(_)) => {
                        warn!(shopify_id = customer.id, %e, "skipping customer");
                        stats.skipped += 1;
                    }
                    Err(e) => {
                        error!(shopify_id = customer.id, %e, "customer failed to reconcile");
                        stats.errors += 1;
                    }
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(stats)
    }
}
