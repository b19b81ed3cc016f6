use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::build_segment_url;
use crate::core::fetch::FetchClient;
use crate::core::price::{PriceProvider, PriceQuote};

/// Latest published NAV from the Danjuan fund platform.
pub struct DanjuanNavProvider {
    base_url: String,
    fetch: Arc<FetchClient>,
}

impl DanjuanNavProvider {
    pub fn new(base_url: &str, fetch: Arc<FetchClient>) -> Self {
        DanjuanNavProvider {
            base_url: base_url.to_string(),
            fetch,
        }
    }
}

#[derive(Deserialize, Debug)]
struct NavHistoryResponse {
    result_code: i64,
    data: Option<NavHistoryData>,
}

#[derive(Deserialize, Debug)]
struct NavHistoryData {
    #[serde(default)]
    items: Vec<NavItem>,
}

#[derive(Deserialize, Debug)]
struct NavItem {
    // Published as a decimal string
    nav: Option<String>,
}

#[async_trait]
impl PriceProvider for DanjuanNavProvider {
    fn id(&self) -> &'static str {
        "danjuan"
    }

    #[instrument(name = "DanjuanNavFetch", skip(self), fields(code = %code))]
    async fn fetch_price(&self, code: &str) -> Result<PriceQuote> {
        let url = build_segment_url(
            &self.base_url,
            &["djapi", "fund", "nav", "history", code],
            &[("page", "1"), ("size", "1")],
        )?;
        debug!("Requesting NAV history from {}", url);

        let response: NavHistoryResponse = self.fetch.get_json(&url).await?;
        if response.result_code != 0 {
            debug!(result_code = response.result_code, "NAV history request rejected");
            return Ok(PriceQuote::NotFound);
        }

        let nav = response
            .data
            .and_then(|data| data.items.into_iter().next())
            .and_then(|item| item.nav)
            .and_then(|nav| nav.trim().parse::<f64>().ok());
        Ok(PriceQuote::from_value(nav))
    }
}
