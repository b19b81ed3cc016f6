use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::build_url;
use crate::core::fetch::FetchClient;
use crate::core::price::{PriceProvider, PriceQuote};

/// CoinGecko-backed spot price provider. Codes are CoinGecko asset ids
/// (`bitcoin`, `ethereum`), prices are in USD.
pub struct CoinGeckoProvider {
    base_url: String,
    api_key: Option<String>,
    fetch: Arc<FetchClient>,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, api_key: Option<&str>, fetch: Arc<FetchClient>) -> Self {
        CoinGeckoProvider {
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
            fetch,
        }
    }
}

// Parsed like: { "bitcoin": {"usd": 12345.6} }
type SimplePriceResponse = HashMap<String, HashMap<String, Option<f64>>>;

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        "coingecko"
    }

    #[instrument(name = "CoinGeckoPriceFetch", skip(self), fields(code = %code))]
    async fn fetch_price(&self, code: &str) -> Result<PriceQuote> {
        let mut params = vec![("ids", code), ("vs_currencies", "usd")];
        if let Some(key) = &self.api_key {
            params.push(("x_cg_demo_api_key", key.as_str()));
        }
        let url = build_url(&self.base_url, "/api/v3/simple/price", &params)?;
        debug!("Requesting price data for {}", code);

        let data: SimplePriceResponse = self.fetch.get_json(&url).await?;
        let price = data
            .get(code)
            .and_then(|quotes| quotes.get("usd").copied().flatten());
        Ok(PriceQuote::from_value(price))
    }
}
