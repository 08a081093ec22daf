//! Gift card creation and disablement against the Admin REST API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{ShopifyAdminClient, ShopifyError};

#[derive(Serialize)]
struct GiftCardCreateEnvelope<'a> {
    gift_card: GiftCardCreateBody<'a>,
}

#[derive(Serialize)]
struct GiftCardCreateBody<'a> {
    code: &'a str,
    /// Decimal carried as a string by the REST API.
    initial_value: String,
    note: &'a str,
}

#[derive(Deserialize)]
struct GiftCardEnvelope {
    gift_card: GiftCardBody,
}

#[derive(Deserialize)]
struct GiftCardBody {
    id: i64,
}

impl ShopifyAdminClient {
    /// Create a gift card mirroring a POS voucher.
    ///
    /// Returns the gift card id to bind on the voucher record.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Shopify rejects the
    /// creation (e.g., duplicate code).
    #[instrument(skip(self), fields(code = %code))]
    pub(crate) async fn create_gift_card_rest(
        &self,
        code: &str,
        initial_value: Decimal,
        note: &str,
    ) -> Result<String, ShopifyError> {
        let url = format!("{}/gift_cards.json", self.base_url());

        let response = self
            .http()
            .post(&url)
            .json(&GiftCardCreateEnvelope {
                gift_card: GiftCardCreateBody {
                    code,
                    initial_value: initial_value.round_dp(2).to_string(),
                    note,
                },
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let envelope: GiftCardEnvelope = response
            .json()
            .await
            .map_err(|e| ShopifyError::Parse(format!("gift card create: {e}")))?;

        Ok(envelope.gift_card.id.to_string())
    }

    /// Permanently disable a gift card after its voucher was redeemed at
    /// the POS. This action cannot be undone.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the gift card is unknown.
    #[instrument(skip(self))]
    pub(crate) async fn disable_gift_card_rest(
        &self,
        gift_card_id: &str,
    ) -> Result<(), ShopifyError> {
        let url = format!("{}/gift_cards/{gift_card_id}/disable.json", self.base_url());

        let response = self.http().post(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        Ok(())
    }
}
