//! Manual sync runs.
//!
//! Builds the engine exactly the way a long-running scheduler process
//! would: open the pool once, construct both gateway clients, hand all
//! three to one [`SyncEngine`], and invoke the operation. The structured
//! report is logged; a failed report exits non-zero so cron and CI
//! notice.

use thiserror::Error;

use mercurios_sync::config::ConfigError;
use mercurios_sync::engine::SyncEngine;
use mercurios_sync::prohandel::{ProHandelClient, ProHandelError};
use mercurios_sync::shopify::{ShopifyAdminClient, ShopifyError};
use mercurios_sync::store::{self, PgIdentityStore};
use mercurios_sync::SyncConfig;

/// Errors that can occur while setting up or running a sync.
#[derive(Debug, Error)]
pub enum SyncCommandError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storefront client error: {0}")]
    Shopify(#[from] ShopifyError),

    #[error("POS client error: {0}")]
    ProHandel(#[from] ProHandelError),

    #[error("sync reported failure: {0}")]
    Failed(String),
}

type Engine = SyncEngine<PgIdentityStore, ShopifyAdminClient, ProHandelClient>;

async fn build_engine() -> Result<Engine, SyncCommandError> {
    let config = SyncConfig::from_env()?;

    let pool = store::create_pool(&config.database_url).await?;
    let store = PgIdentityStore::new(pool);
    let storefront = ShopifyAdminClient::new(&config.shopify, config.page_size)?;
    let pos = ProHandelClient::new(&config.prohandel)?;

    Ok(SyncEngine::new(store, storefront, pos, config.lookback()))
}

/// Reconcile every storefront customer.
///
/// # Errors
///
/// Returns `SyncCommandError` on setup failure or when the batch aborts.
pub async fn customers() -> Result<(), SyncCommandError> {
    let engine = build_engine().await?;

    tracing::info!("Starting customer batch reconciliation...");
    let report = engine.reconcile_customer_batch().await;

    if let Some(stats) = &report.counts {
        tracing::info!(
            processed = stats.processed,
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            errors = stats.errors,
            "Customer batch finished"
        );
    }

    match report.error {
        None => Ok(()),
        Some(error) => Err(SyncCommandError::Failed(error)),
    }
}

/// One POS voucher poll cycle: issuance plus redemption sync.
///
/// # Errors
///
/// Returns `SyncCommandError` on setup failure or when the run aborts.
pub async fn vouchers() -> Result<(), SyncCommandError> {
    let engine = build_engine().await?;

    tracing::info!("Starting POS voucher sync...");
    let report = engine.reconcile_voucher_issuance_and_redemption().await;

    if let Some(stats) = &report.counts {
        tracing::info!(
            issued = stats.issued,
            redeemed = stats.redeemed,
            skipped = stats.skipped,
            errors = stats.errors,
            gift_card_failures = stats.gift_card_failures,
            disable_failures = stats.disable_failures,
            "POS voucher sync finished"
        );
    }

    match report.error {
        None => Ok(()),
        Some(error) => Err(SyncCommandError::Failed(error)),
    }
}
