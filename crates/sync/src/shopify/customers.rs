//! Customer pagination against the Admin REST API.
//!
//! Shopify pages with an opaque `page_info` cursor delivered in the
//! `Link` response header; when a `page_info` is supplied, no filter
//! parameters other than `limit` may accompany it.

use serde::Deserialize;
use tracing::instrument;

use super::{ShopifyAdminClient, ShopifyError, types::ShopifyCustomer};

/// One page of customers plus the cursor for the next page.
#[derive(Debug)]
pub struct CustomerPage {
    pub customers: Vec<ShopifyCustomer>,
    /// `page_info` cursor for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct CustomersEnvelope {
    customers: Vec<ShopifyCustomer>,
}

impl ShopifyAdminClient {
    /// Fetch one page of customers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, is rate limited, or the
    /// response cannot be parsed.
    #[instrument(skip(self))]
    pub(crate) async fn fetch_customer_page(
        &self,
        page_token: Option<&str>,
    ) -> Result<CustomerPage, ShopifyError> {
        let url = format!("{}/customers.json", self.base_url());

        let mut request = self
            .http()
            .get(&url)
            .query(&[("limit", self.page_size().to_string())]);
        if let Some(token) = page_token {
            request = request.query(&[("page_info", token)]);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let next_page_token = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_page_info);

        let envelope: CustomersEnvelope = response
            .json()
            .await
            .map_err(|e| ShopifyError::Parse(format!("customers page: {e}")))?;

        Ok(CustomerPage {
            customers: envelope.customers,
            next_page_token,
        })
    }
}

/// Extract the `page_info` cursor from the `rel="next"` segment of a
/// `Link` header, if present.
fn parse_next_page_info(header: &str) -> Option<String> {
    header.split(',').find_map(|segment| {
        let (target, params) = segment.split_once(';')?;
        if !params.contains("rel=\"next\"") {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = url::Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(name, _)| name == "page_info")
            .map(|(_, value)| value.into_owned())
    })
}
