//! Voucher reconciliation in both directions.
//!
//! **POS -> storefront**: a timed poll imports newly issued POS vouchers
//! (persist first, then mirror as a gift card) and applies POS redemption
//! events (internal transition first, then best-effort gift card
//! disable). The POS is the source of truth for voucher existence and
//! in-store redemption.
//!
//! **Storefront -> POS**: each paid order is scanned for gift-card
//! purchases (create a voucher per line) and gift-card payments (apply
//! the redemption delta once per order id).

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, instrument, warn};

use mercurios_core::{CurrencyCode, NewVoucherRecord, RedemptionOutcome};

use crate::error::SyncError;
use crate::prohandel::{PosGateway, PosRedemption, PosVoucher};
use crate::shopify::{StorefrontGateway, types::OrderEvent};
use crate::store::{IdentityStore, StoreError, VoucherKeys};

use super::{OrderVoucherStats, SyncWindow, VoucherSyncStats, resolver};

/// What importing one changed POS voucher did.
enum PosImport {
    /// Persisted and mirrored as a gift card.
    Created,
    /// Persisted, but the gift card creation failed; the record stays
    /// unbound until a later poll re-attempts it.
    CreatedUnbound,
    /// Already known (earlier poll or concurrent run).
    AlreadyKnown,
}

/// What applying one POS redemption event did.
enum PosRedeem {
    Redeemed,
    /// Internal transition applied, but the gift card disable failed.
    RedeemedDisableFailed,
    /// Unknown voucher or already redeemed.
    Skipped,
}

/// Reconciles vouchers between the POS and the storefront.
///
/// Holds only borrowed handles; construct one per invocation.
pub struct VoucherReconciler<'a, S, SF, P> {
    store: &'a S,
    storefront: &'a SF,
    pos: &'a P,
    lookback: Duration,
}

impl<'a, S, SF, P> VoucherReconciler<'a, S, SF, P>
where
    S: IdentityStore,
    SF: StorefrontGateway,
    P: PosGateway,
{
    #[must_use]
    pub const fn new(store: &'a S, storefront: &'a SF, pos: &'a P, lookback: Duration) -> Self {
        Self {
            store,
            storefront,
            pos,
            lookback,
        }
    }

    // =========================================================================
    // Direction A: POS -> storefront (poll)
    // =========================================================================

    /// One poll cycle: import changed POS vouchers, then apply POS
    /// redemption events.
    ///
    /// Per-record failures are logged and counted without stopping the
    /// run; a window fetch failure aborts it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Pos`] when either changed-feed fetch fails.
    #[instrument(skip_all)]
    pub async fn sync_pos_changes(&self) -> Result<VoucherSyncStats, SyncError> {
        let window = SyncWindow::lookback(Utc::now(), self.lookback);
        info!(since = %window.since, "polling POS for voucher changes");

        let mut stats = VoucherSyncStats::default();

        let changed = self.pos.vouchers_changed_since(window.since).await?;
        for voucher in &changed {
            match self.import_pos_voucher(voucher).await {
                Ok(PosImport::Created) => stats.issued += 1,
                Ok(PosImport::CreatedUnbound) => {
                    stats.issued += 1;
                    stats.gift_card_failures += 1;
                }
                Ok(PosImport::AlreadyKnown) => stats.skipped += 1,
                Err(e) => {
                    error!(pos_number = voucher.number, %e, "voucher import failed");
                    stats.errors += 1;
                }
            }
        }

        let redemptions = self.pos.redemptions_changed_since(window.since).await?;
        for redemption in &redemptions {
            match self.apply_pos_redemption(redemption).await {
                Ok(PosRedeem::Redeemed) => stats.redeemed += 1,
                Ok(PosRedeem::RedeemedDisableFailed) => {
                    stats.redeemed += 1;
                    stats.disable_failures += 1;
                }
                Ok(PosRedeem::Skipped) => stats.skipped += 1,
                Err(e) => {
                    error!(pos_uuid = %redemption.id, %e, "redemption sync failed");
                    stats.errors += 1;
                }
            }
        }

        info!(
            issued = stats.issued,
            redeemed = stats.redeemed,
            skipped = stats.skipped,
            errors = stats.errors,
            "POS voucher sync finished"
        );
        Ok(stats)
    }

    async fn import_pos_voucher(&self, voucher: &PosVoucher) -> Result<PosImport, SyncError> {
        let keys = resolver::pos_voucher_keys(voucher);

        if self.store.find_voucher(&keys).await?.is_some() {
            // Known voucher re-reported inside the overlap; redemption
            // state is handled by the redemption feed.
            return Ok(PosImport::AlreadyKnown);
        }

        let now = Utc::now();
        let code = voucher.storefront_code();
        let draft = NewVoucherRecord::issued(
            code.clone(),
            voucher.value,
            CurrencyCode::EUR,
            voucher.date.unwrap_or(now),
        )
        .with_pos_identity(voucher.id, voucher.number);

        // Persist before mirroring: the POS already owns this voucher, so
        // an internal record without a gift card binding beats a gift
        // card without an internal record.
        let mut record = match self.store.insert_voucher(draft).await {
            Ok(record) => record,
            Err(StoreError::Conflict(reason)) => {
                debug!(%reason, "voucher already created by a concurrent run");
                return Ok(PosImport::AlreadyKnown);
            }
            Err(e) => return Err(e.into()),
        };

        info!(code = %code, value = %voucher.value, "imported new POS voucher");

        let note = format!("ProHandel Import: {}", voucher.number);
        match self
            .storefront
            .create_gift_card(&code, voucher.value, &note)
            .await
        {
            Ok(gift_card_id) => {
                record.bind_gift_card(gift_card_id);
                self.store.save_voucher(&record).await?;
                Ok(PosImport::Created)
            }
            Err(e) => {
                warn!(code = %code, %e, "gift card creation failed; voucher stays unbound");
                Ok(PosImport::CreatedUnbound)
            }
        }
    }

    async fn apply_pos_redemption(
        &self,
        redemption: &PosRedemption,
    ) -> Result<PosRedeem, SyncError> {
        let keys = VoucherKeys::pos_uuid(redemption.id);

        let Some(mut record) = self.store.find_voucher(&keys).await? else {
            debug!(pos_uuid = %redemption.id, "redemption for unknown voucher, skipping");
            return Ok(PosRedeem::Skipped);
        };

        let redeemed_at = redemption.voucher_redemption_date.unwrap_or_else(Utc::now);
        if !record.redeem_in_full(redeemed_at) {
            // Already redeemed (or otherwise closed): the same change
            // event re-delivered by an overlapping window.
            return Ok(PosRedeem::Skipped);
        }

        // The internal transition is authoritative once the POS confirms
        // redemption; persist it before touching the storefront.
        self.store.save_voucher(&record).await?;
        info!(code = %record.code, "voucher redeemed at POS");

        let Some(gift_card_id) = record.gift_card_id.clone() else {
            return Ok(PosRedeem::Redeemed);
        };

        match self.storefront.disable_gift_card(&gift_card_id).await {
            Ok(()) => Ok(PosRedeem::Redeemed),
            Err(e) => {
                // Best-effort mirror: never revert the internal state.
                warn!(code = %record.code, %e, "gift card disable failed");
                Ok(PosRedeem::RedeemedDisableFailed)
            }
        }
    }

    // =========================================================================
    // Direction B: storefront -> POS (per paid order)
    // =========================================================================

    /// Apply one paid order: record purchased vouchers and apply
    /// gift-card redemption deltas.
    ///
    /// Redelivery-safe: purchases key on the voucher code, deltas key on
    /// the order id recorded in `applied_orders`. Per-record failures are
    /// logged and counted without failing the order.
    ///
    /// # Errors
    ///
    /// Currently never fails as a whole; the `Result` keeps the contract
    /// symmetrical with the poll direction for callers.
    #[instrument(skip_all, fields(order_id = order.id))]
    pub async fn apply_order(&self, order: &OrderEvent) -> Result<OrderVoucherStats, SyncError> {
        let mut stats = OrderVoucherStats::default();
        let now = Utc::now();
        let order_key = order.order_key();

        let gift_card_lines: Vec<usize> = order
            .line_items
            .iter()
            .enumerate()
            .filter(|(_, line)| line.gift_card)
            .map(|(index, _)| index)
            .collect();

        for index in gift_card_lines {
            match self.record_purchased_voucher(order, index, now).await {
                Ok(true) => stats.vouchers_created += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(line = index, %e, "voucher purchase failed to record");
                    stats.errors += 1;
                }
            }
        }

        for redemption in &order.gift_card_redemptions {
            match self
                .apply_order_delta(&order_key, &redemption.code, redemption.amount_decimal(), now)
                .await
            {
                Ok(DeltaApplied::Applied { clamped }) => {
                    stats.redemptions_applied += 1;
                    if clamped {
                        stats.clamped += 1;
                    }
                }
                Ok(DeltaApplied::AlreadyApplied) => stats.already_applied += 1,
                Ok(DeltaApplied::Skipped) => stats.skipped += 1,
                Err(e) => {
                    error!(code = %redemption.code, %e, "redemption delta failed to apply");
                    stats.errors += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Record a voucher purchased on a gift-card line item.
    ///
    /// Returns `Ok(false)` when the voucher already exists (an earlier
    /// delivery of the same order).
    async fn record_purchased_voucher(
        &self,
        order: &OrderEvent,
        line_index: usize,
        now: DateTime<Utc>,
    ) -> Result<bool, SyncError> {
        let Some(line) = order.line_items.get(line_index) else {
            return Ok(false);
        };

        let Some(value) = line.unit_price() else {
            warn!(line = line_index, "gift card line has no parseable price, skipping");
            return Ok(false);
        };

        // Prefer the storefront-assigned code; otherwise derive one from
        // the order so a redelivered webhook regenerates the same code
        // and collides on the unique constraint instead of duplicating.
        let code = line.voucher_code().map_or_else(
            || order_line_code(order, line_index),
            ToOwned::to_owned,
        );

        let currency = order
            .currency
            .as_deref()
            .and_then(|c| c.parse().ok())
            .unwrap_or_default();

        if self
            .store
            .find_voucher(&VoucherKeys::code(code.clone()))
            .await?
            .is_some()
        {
            return Ok(false);
        }

        let draft = NewVoucherRecord::issued(code.clone(), value, currency, now)
            .with_order(order.order_key(), order.buyer_snapshot());

        match self.store.insert_voucher(draft).await {
            Ok(_) => {
                info!(code = %code, value = %value, "voucher created from order");
                Ok(true)
            }
            Err(StoreError::Conflict(reason)) => {
                debug!(%reason, "voucher already created for this order line");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_order_delta(
        &self,
        order_key: &str,
        code: &str,
        amount: Option<rust_decimal::Decimal>,
        now: DateTime<Utc>,
    ) -> Result<DeltaApplied, SyncError> {
        let Some(amount) = amount else {
            warn!(code = %code, "redemption carries no parseable amount, skipping");
            return Ok(DeltaApplied::Skipped);
        };

        let Some(mut record) = self
            .store
            .find_voucher(&VoucherKeys::code(code.to_owned()))
            .await?
        else {
            warn!(code = %code, "redemption references unknown voucher, skipping");
            return Ok(DeltaApplied::Skipped);
        };

        match record.apply_order_redemption(order_key, amount, now) {
            RedemptionOutcome::Applied { status, clamped } => {
                if clamped {
                    warn!(
                        code = %code,
                        initial_value = %record.initial_value,
                        "redemption delta exceeded remaining value and was clamped"
                    );
                }
                self.store.save_voucher(&record).await?;
                debug!(code = %code, status = %status, "redemption delta applied");
                Ok(DeltaApplied::Applied { clamped })
            }
            RedemptionOutcome::AlreadyApplied => {
                debug!(code = %code, "order delta already applied, redelivery skipped");
                Ok(DeltaApplied::AlreadyApplied)
            }
            RedemptionOutcome::AlreadyClosed => {
                debug!(code = %code, "voucher already closed, delta skipped");
                Ok(DeltaApplied::Skipped)
            }
        }
    }
}

enum DeltaApplied {
    Applied { clamped: bool },
    AlreadyApplied,
    Skipped,
}

/// Deterministic fallback code for a gift-card line the storefront did
/// not assign a code to. Stable across redeliveries of the same order.
fn order_line_code(order: &OrderEvent, line_index: usize) -> String {
    let order_ref = order.order_number.unwrap_or(order.id);
    format!("GC-{order_ref}-{}", line_index + 1)
}
