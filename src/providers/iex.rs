use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::build_segment_url;
use crate::core::fetch::FetchClient;
use crate::core::price::{PriceProvider, PriceQuote};

/// Real-time quotes for US tickers.
pub struct IexQuoteProvider {
    base_url: String,
    token: Option<String>,
    fetch: Arc<FetchClient>,
}

impl IexQuoteProvider {
    pub fn new(base_url: &str, token: Option<&str>, fetch: Arc<FetchClient>) -> Self {
        IexQuoteProvider {
            base_url: base_url.to_string(),
            token: token.map(str::to_string),
            fetch,
        }
    }
}

#[derive(Deserialize, Debug)]
struct IexQuote {
    #[serde(alias = "latestPrice")]
    latest_price: Option<f64>,
}

#[async_trait]
impl PriceProvider for IexQuoteProvider {
    fn id(&self) -> &'static str {
        "iex"
    }

    #[instrument(name = "IexQuoteFetch", skip(self), fields(ticker = %ticker))]
    async fn fetch_price(&self, ticker: &str) -> Result<PriceQuote> {
        let params: Vec<(&str, &str)> = match &self.token {
            Some(token) => vec![("token", token.as_str())],
            None => Vec::new(),
        };
        let url = build_segment_url(
            &self.base_url,
            &["stable", "stock", ticker, "quote"],
            &params,
        )?;
        debug!("Requesting quote for {}", ticker);

        let quote: IexQuote = self.fetch.get_json(&url).await?;
        Ok(PriceQuote::from_value(quote.latest_price))
    }
}
