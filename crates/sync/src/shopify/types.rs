//! Wire types for Admin REST payloads and webhook deliveries.
//!
//! These deserialize tolerantly: unknown fields are ignored and most
//! fields default, because Shopify payloads carry far more than the
//! engine reads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mercurios_core::{CustomerSnapshot, ProfilePatch, ShopifyIntegration, SyncStatus};

/// A webhook delivery envelope: topic, shop identity, raw payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Webhook topic, e.g. `customers/update` or `orders/paid`.
    pub topic: String,
    /// The shop domain the delivery belongs to.
    pub shop: String,
    /// The raw payload, interpreted per topic.
    pub payload: serde_json::Value,
}

/// A customer as the Admin REST API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyCustomer {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub orders_count: i64,
    /// Decimal carried as a string by the REST API.
    #[serde(default)]
    pub total_spent: Option<String>,
    #[serde(default)]
    pub last_order_id: Option<i64>,
    /// Comma-separated tag list.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub default_address: Option<ShopifyAddress>,
}

/// The default address block on a REST customer.
#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyAddress {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl ShopifyAddress {
    /// One-line summary for the profile address field.
    #[must_use]
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.address1.as_deref(),
            self.zip.as_deref(),
            self.city.as_deref(),
            self.country.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

impl ShopifyCustomer {
    /// Profile fields for the fill-if-empty merge.
    #[must_use]
    pub fn profile_patch(&self) -> ProfilePatch {
        ProfilePatch {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            address: self.default_address.as_ref().and_then(ShopifyAddress::summary),
        }
    }

    /// Build the integration sub-record mirroring this payload.
    ///
    /// Applied unconditionally on merge: these fields are the external
    /// system's current truth.
    #[must_use]
    pub fn integration(&self, now: DateTime<Utc>) -> ShopifyIntegration {
        ShopifyIntegration {
            shopify_customer_id: Some(self.id.to_string()),
            orders_count: self.orders_count,
            total_spent: self
                .total_spent
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            last_order_id: self.last_order_id.map(|id| id.to_string()),
            tags: self
                .tags
                .as_deref()
                .map(split_tags)
                .unwrap_or_default(),
            sync_status: SyncStatus::Synced,
            last_sync_date: Some(now),
            sync_error: None,
        }
    }
}

/// Split Shopify's comma-separated tag string.
fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// A paid-order event, as delivered by the `orders/paid` webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderEvent {
    pub id: i64,
    #[serde(default)]
    pub order_number: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer: Option<OrderCustomer>,
    #[serde(default)]
    pub line_items: Vec<OrderLineItem>,
    /// Gift cards applied as payment on this order.
    #[serde(default)]
    pub gift_card_redemptions: Vec<GiftCardRedemption>,
}

impl OrderEvent {
    /// The order id as the reconciliation key for redemption application.
    #[must_use]
    pub fn order_key(&self) -> String {
        self.id.to_string()
    }

    /// Point-in-time buyer snapshot for vouchers purchased on this order.
    #[must_use]
    pub fn buyer_snapshot(&self) -> Option<CustomerSnapshot> {
        self.customer.as_ref().map(|c| CustomerSnapshot {
            shopify_id: Some(c.id.to_string()),
            email: c.email.clone(),
            first_name: c.first_name.clone(),
            last_name: c.last_name.clone(),
        })
    }
}

/// The buyer block on an order payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderCustomer {
    pub id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// One order line item; `gift_card` marks voucher purchases.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub quantity: i64,
    /// Unit price carried as a string by the REST API.
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub gift_card: bool,
    #[serde(default)]
    pub properties: Vec<LineItemProperty>,
}

impl OrderLineItem {
    /// The voucher code attached to this line, if the storefront supplied
    /// one via line properties.
    #[must_use]
    pub fn voucher_code(&self) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| matches!(p.name.as_str(), "code" | "gift_card_code"))
            .map(|p| p.value.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// The unit price as a decimal, when parseable.
    #[must_use]
    pub fn unit_price(&self) -> Option<Decimal> {
        self.price.as_deref().and_then(|p| p.parse().ok())
    }
}

/// A name/value line item property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemProperty {
    pub name: String,
    pub value: String,
}

/// Amount applied from an existing gift card as payment on an order.
#[derive(Debug, Clone, Deserialize)]
pub struct GiftCardRedemption {
    /// The gift card code the amount was drawn from.
    pub code: String,
    /// Decimal carried as a string by the REST API.
    pub amount: String,
}

impl GiftCardRedemption {
    /// The applied amount as a decimal.
    #[must_use]
    pub fn amount_decimal(&self) -> Option<Decimal> {
        self.amount.parse().ok()
    }
}
