//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

/// Outcome of a single price lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceQuote {
    Found(f64),
    NotFound,
}

impl PriceQuote {
    /// Builds a quote from a raw provider value. Absent, non-finite and
    /// non-positive values are never treated as prices.
    pub fn from_value(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() && v > 0.0 => PriceQuote::Found(v),
            _ => PriceQuote::NotFound,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, PriceQuote::Found(_))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            PriceQuote::Found(v) => Some(*v),
            PriceQuote::NotFound => None,
        }
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Short name used in logs and as the snapshot cache key.
    fn id(&self) -> &'static str;

    async fn fetch_price(&self, code: &str) -> Result<PriceQuote>;

    /// Like `fetch_price`, but every failure is reported as `NotFound`.
    async fn lookup(&self, code: &str) -> PriceQuote {
        match self.fetch_price(code).await {
            Ok(quote) => {
                if !quote.is_found() {
                    debug!(provider = self.id(), code, "Price not found");
                }
                quote
            }
            Err(e) => {
                debug!(provider = self.id(), code, error = %e, "Price fetch failed");
                PriceQuote::NotFound
            }
        }
    }
}
