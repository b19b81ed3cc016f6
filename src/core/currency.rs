//! Currency conversion abstractions

use super::price::PriceQuote;
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Spot rate for `from/to`, i.e. how many `to` one `from` buys.
    async fn get_rate(&self, from: &str, to: &str) -> Result<PriceQuote>;
}
