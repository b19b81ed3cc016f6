//! Adapters for the self-hosted market-data gateway.
//!
//! Every endpoint answers `GET {base}/api/public/{name}` with a JSON array of
//! rows keyed by the upstream (Chinese) column names.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::gateway_url;
use crate::core::cache::SnapshotCache;
use crate::core::currency::CurrencyRateProvider;
use crate::core::fetch::FetchClient;
use crate::core::price::{PriceProvider, PriceQuote};

/// One row of a bulk price listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRow {
    #[serde(rename = "代码", default)]
    pub code: String,
    #[serde(rename = "最新价", default)]
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MinuteBar {
    #[serde(rename = "最新价", default)]
    price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct NavRow {
    #[serde(rename = "单位净值", default)]
    nav: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FxRow {
    #[serde(rename = "货币对", default)]
    pair: String,
    #[serde(rename = "买报价", default)]
    bid: Option<f64>,
}

/// Latest bar of an intraday minute series.
pub struct MinuteHistoryProvider {
    id: &'static str,
    base_url: String,
    endpoint: &'static str,
    extra_params: &'static [(&'static str, &'static str)],
    fetch: Arc<FetchClient>,
}

impl MinuteHistoryProvider {
    pub fn hk(base_url: &str, fetch: Arc<FetchClient>) -> Self {
        MinuteHistoryProvider {
            id: "hk_minute",
            base_url: base_url.to_string(),
            endpoint: "stock_hk_hist_min_em",
            extra_params: &[("period", "1"), ("adjust", ""), ("start_date", "2022-01-01")],
            fetch,
        }
    }

    pub fn us(base_url: &str, fetch: Arc<FetchClient>) -> Self {
        MinuteHistoryProvider {
            id: "us_minute",
            base_url: base_url.to_string(),
            endpoint: "stock_us_hist_min_em",
            extra_params: &[],
            fetch,
        }
    }
}

#[async_trait]
impl PriceProvider for MinuteHistoryProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    #[instrument(name = "MinuteHistoryFetch", skip(self), fields(code = %code))]
    async fn fetch_price(&self, code: &str) -> Result<PriceQuote> {
        let mut params = vec![("symbol", code)];
        params.extend_from_slice(self.extra_params);
        let url = gateway_url(&self.base_url, self.endpoint, &params)?;
        debug!("Requesting minute history from {}", url);

        let bars: Vec<MinuteBar> = self.fetch.get_json(&url).await?;
        Ok(PriceQuote::from_value(bars.last().and_then(|bar| bar.price)))
    }
}

/// How a requested code is matched against the `代码` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    /// Listing codes carry an exchange prefix, e.g. `sh510300`.
    Contains,
}

impl MatchMode {
    fn matches(&self, row_code: &str, code: &str) -> bool {
        match self {
            MatchMode::Exact => row_code == code,
            MatchMode::Contains => row_code.contains(code),
        }
    }
}

/// Bulk listing searched locally; the full listing is kept in the shared
/// snapshot cache under this provider's id.
pub struct SnapshotProvider {
    id: &'static str,
    base_url: String,
    endpoint: &'static str,
    params: &'static [(&'static str, &'static str)],
    match_mode: MatchMode,
    fetch: Arc<FetchClient>,
    cache: Arc<SnapshotCache<Vec<SnapshotRow>>>,
}

impl SnapshotProvider {
    fn new(
        id: &'static str,
        base_url: &str,
        endpoint: &'static str,
        params: &'static [(&'static str, &'static str)],
        match_mode: MatchMode,
        fetch: Arc<FetchClient>,
        cache: Arc<SnapshotCache<Vec<SnapshotRow>>>,
    ) -> Self {
        SnapshotProvider {
            id,
            base_url: base_url.to_string(),
            endpoint,
            params,
            match_mode,
            fetch,
            cache,
        }
    }

    pub fn cn_equity(
        base_url: &str,
        fetch: Arc<FetchClient>,
        cache: Arc<SnapshotCache<Vec<SnapshotRow>>>,
    ) -> Self {
        Self::new(
            "cn_spot",
            base_url,
            "stock_zh_a_spot_em",
            &[],
            MatchMode::Exact,
            fetch,
            cache,
        )
    }

    pub fn etf_category(
        base_url: &str,
        fetch: Arc<FetchClient>,
        cache: Arc<SnapshotCache<Vec<SnapshotRow>>>,
    ) -> Self {
        Self::new(
            "etf_category",
            base_url,
            "fund_etf_category_sina",
            &[("symbol", "ETF基金")],
            MatchMode::Contains,
            fetch,
            cache,
        )
    }

    pub fn lof_category(
        base_url: &str,
        fetch: Arc<FetchClient>,
        cache: Arc<SnapshotCache<Vec<SnapshotRow>>>,
    ) -> Self {
        Self::new(
            "lof_category",
            base_url,
            "fund_etf_category_sina",
            &[("symbol", "LOF基金")],
            MatchMode::Contains,
            fetch,
            cache,
        )
    }

    pub fn closed_fund_category(
        base_url: &str,
        fetch: Arc<FetchClient>,
        cache: Arc<SnapshotCache<Vec<SnapshotRow>>>,
    ) -> Self {
        Self::new(
            "closed_fund_category",
            base_url,
            "fund_etf_category_sina",
            &[("symbol", "封闭式基金")],
            MatchMode::Contains,
            fetch,
            cache,
        )
    }

    pub fn etf_spot(
        base_url: &str,
        fetch: Arc<FetchClient>,
        cache: Arc<SnapshotCache<Vec<SnapshotRow>>>,
    ) -> Self {
        Self::new(
            "etf_spot",
            base_url,
            "fund_etf_spot_em",
            &[],
            MatchMode::Contains,
            fetch,
            cache,
        )
    }

    pub fn lof_spot(
        base_url: &str,
        fetch: Arc<FetchClient>,
        cache: Arc<SnapshotCache<Vec<SnapshotRow>>>,
    ) -> Self {
        Self::new(
            "lof_spot",
            base_url,
            "fund_lof_spot_em",
            &[],
            MatchMode::Contains,
            fetch,
            cache,
        )
    }

    async fn snapshot(&self) -> Result<Arc<Vec<SnapshotRow>>> {
        if let Some(rows) = self.cache.get(self.id).await {
            return Ok(rows);
        }

        let url = gateway_url(&self.base_url, self.endpoint, self.params)?;
        debug!("Requesting snapshot from {}", url);
        let rows: Vec<SnapshotRow> = self.fetch.get_json(&url).await?;
        debug!(provider = self.id, rows = rows.len(), "Fetched snapshot");
        Ok(self.cache.put(self.id, rows).await)
    }
}

#[async_trait]
impl PriceProvider for SnapshotProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    #[instrument(name = "SnapshotLookup", skip(self), fields(code = %code))]
    async fn fetch_price(&self, code: &str) -> Result<PriceQuote> {
        if code.is_empty() {
            return Ok(PriceQuote::NotFound);
        }
        let rows = self.snapshot().await?;
        let price = rows
            .iter()
            .find(|row| self.match_mode.matches(&row.code, code))
            .and_then(|row| row.price);
        Ok(PriceQuote::from_value(price))
    }
}

/// Unit NAV of an open-ended fund, taken from the last row of its NAV trend.
pub struct OpenFundNavProvider {
    base_url: String,
    fetch: Arc<FetchClient>,
}

impl OpenFundNavProvider {
    pub fn new(base_url: &str, fetch: Arc<FetchClient>) -> Self {
        OpenFundNavProvider {
            base_url: base_url.to_string(),
            fetch,
        }
    }
}

#[async_trait]
impl PriceProvider for OpenFundNavProvider {
    fn id(&self) -> &'static str {
        "open_fund_nav"
    }

    #[instrument(name = "OpenFundNavFetch", skip(self), fields(code = %code))]
    async fn fetch_price(&self, code: &str) -> Result<PriceQuote> {
        let url = gateway_url(
            &self.base_url,
            "fund_open_fund_info_em",
            &[("fund", code), ("indicator", "单位净值走势")],
        )?;
        debug!("Requesting fund NAV history from {}", url);

        let rows: Vec<NavRow> = self.fetch.get_json(&url).await?;
        Ok(PriceQuote::from_value(rows.last().and_then(|row| row.nav)))
    }
}

/// Spot FX bid quotes, looked up by `FROM/TO` pair.
pub struct FxSpotProvider {
    base_url: String,
    fetch: Arc<FetchClient>,
}

impl FxSpotProvider {
    pub fn new(base_url: &str, fetch: Arc<FetchClient>) -> Self {
        FxSpotProvider {
            base_url: base_url.to_string(),
            fetch,
        }
    }
}

#[async_trait]
impl CurrencyRateProvider for FxSpotProvider {
    #[instrument(name = "FxSpotFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<PriceQuote> {
        let url = gateway_url(&self.base_url, "fx_spot_quote", &[])?;
        let pair = format!("{}/{}", from, to);
        debug!("Requesting {} from {}", pair, url);

        let rows: Vec<FxRow> = self.fetch.get_json(&url).await?;
        let bid = rows.iter().find(|row| row.pair == pair).and_then(|row| row.bid);
        Ok(PriceQuote::from_value(bid))
    }
}
