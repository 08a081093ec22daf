//! Wire types for the ProHandel voucher endpoints.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// A voucher as reported by `/voucher/changed/{since}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosVoucher {
    /// POS voucher UUID.
    pub id: Uuid,
    /// Human-facing voucher number.
    pub number: i64,
    /// Face value.
    pub value: Decimal,
    /// Online-redeemable code, when the POS assigned one.
    #[serde(default)]
    pub internet_code: Option<String>,
    /// When the voucher was issued/changed.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl PosVoucher {
    /// The storefront code for this voucher: the POS internet code when
    /// present, else the decimal voucher number.
    #[must_use]
    pub fn storefront_code(&self) -> String {
        self.internet_code
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map_or_else(|| self.number.to_string(), ToOwned::to_owned)
    }
}

/// A redemption event as reported by `/voucher/redemption/changed/{since}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosRedemption {
    /// UUID of the redeemed voucher.
    pub id: Uuid,
    /// When the voucher was redeemed at the till.
    #[serde(default)]
    pub voucher_redemption_date: Option<DateTime<Utc>>,
}
