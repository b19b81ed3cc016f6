pub mod coingecko;
pub mod danjuan;
pub mod gateway;
pub mod iex;

use crate::core::cache::SnapshotCache;
use crate::core::config::AppConfig;
use crate::core::currency::CurrencyRateProvider;
use crate::core::fetch::FetchClient;
use crate::core::resolver::ChainProviders;
use anyhow::{Result, anyhow};
use reqwest::Url;
use std::sync::Arc;

pub use coingecko::CoinGeckoProvider;
pub use danjuan::DanjuanNavProvider;
pub use gateway::{
    FxSpotProvider, MatchMode, MinuteHistoryProvider, OpenFundNavProvider, SnapshotProvider,
    SnapshotRow,
};
pub use iex::IexQuoteProvider;

/// Joins `base` and `path` and appends percent-encoded query parameters.
pub fn build_url(base: &str, path: &str, params: &[(&str, &str)]) -> Result<String> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    let url = if params.is_empty() {
        Url::parse(&raw)?
    } else {
        Url::parse_with_params(&raw, params)?
    };
    Ok(url.into())
}

/// Appends `segments` to the path of `base`, percent-encoding each one, so a
/// code containing `/`, `?` or `#` stays a single segment.
pub fn build_segment_url(base: &str, segments: &[&str], params: &[(&str, &str)]) -> Result<String> {
    let mut url = Url::parse(base.trim_end_matches('/'))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("{} cannot be used as a base URL", base))?
        .pop_if_empty()
        .extend(segments);
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url.into())
}

/// URL of a named endpoint on the market-data gateway.
pub fn gateway_url(base: &str, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
    build_url(base, &format!("/api/public/{}", endpoint), params)
}

/// Builds every adapter used by the standard fallback chains.
///
/// All bulk gateway providers share `cache`, one slot each.
pub fn chain_providers(
    config: &AppConfig,
    fetch: &Arc<FetchClient>,
    cache: &Arc<SnapshotCache<Vec<SnapshotRow>>>,
) -> ChainProviders {
    let gateway = config.gateway.base_url.as_str();
    let providers = &config.providers;

    ChainProviders {
        crypto_spot: Arc::new(CoinGeckoProvider::new(
            &providers.coingecko.base_url,
            providers.coingecko.api_key.as_deref(),
            fetch.clone(),
        )),
        hk_minute: Arc::new(MinuteHistoryProvider::hk(gateway, fetch.clone())),
        us_quote: Arc::new(IexQuoteProvider::new(
            &providers.iex.base_url,
            providers.iex.token.as_deref(),
            fetch.clone(),
        )),
        us_minute: Arc::new(MinuteHistoryProvider::us(gateway, fetch.clone())),
        cn_snapshot: Arc::new(SnapshotProvider::cn_equity(gateway, fetch.clone(), cache.clone())),
        etf_category: Arc::new(SnapshotProvider::etf_category(
            gateway,
            fetch.clone(),
            cache.clone(),
        )),
        lof_category: Arc::new(SnapshotProvider::lof_category(
            gateway,
            fetch.clone(),
            cache.clone(),
        )),
        closed_fund_category: Arc::new(SnapshotProvider::closed_fund_category(
            gateway,
            fetch.clone(),
            cache.clone(),
        )),
        etf_spot: Arc::new(SnapshotProvider::etf_spot(gateway, fetch.clone(), cache.clone())),
        lof_spot: Arc::new(SnapshotProvider::lof_spot(gateway, fetch.clone(), cache.clone())),
        open_fund_nav: Arc::new(OpenFundNavProvider::new(gateway, fetch.clone())),
        third_party_nav: Arc::new(DanjuanNavProvider::new(
            &providers.danjuan.base_url,
            fetch.clone(),
        )),
    }
}

pub fn rate_provider(config: &AppConfig, fetch: &Arc<FetchClient>) -> Arc<dyn CurrencyRateProvider> {
    Arc::new(FxSpotProvider::new(&config.gateway.base_url, fetch.clone()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::fetch::FetchOptions;
    use std::time::Duration;

    /// A fetch client that fails fast: no retries, short timeout.
    pub(crate) fn test_fetch_client() -> Arc<FetchClient> {
        Arc::new(
            FetchClient::new(FetchOptions {
                timeout: Duration::from_secs(2),
                retries: 0,
                backoff: Duration::from_millis(1),
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_gateway_url_encodes_params() {
        let url = gateway_url(
            "http://127.0.0.1:8080/",
            "fund_etf_category_sina",
            &[("symbol", "ETF基金")],
        )
        .unwrap();
        assert!(url.starts_with("http://127.0.0.1:8080/api/public/fund_etf_category_sina?symbol="));
        assert!(!url.contains("基金"));
    }

    #[test]
    fn test_build_url_without_params() {
        let url = build_url("https://danjuanfunds.com", "/djapi/fund/nav/history/000001", &[]).unwrap();
        assert_eq!(url, "https://danjuanfunds.com/djapi/fund/nav/history/000001");
    }

    #[test]
    fn test_segment_url_escapes_codes() {
        let url = build_segment_url(
            "https://cloud.iexapis.com/",
            &["stable", "stock", "BRK/B?x#y", "quote"],
            &[("token", "pk_test")],
        )
        .unwrap();
        assert_eq!(
            url,
            "https://cloud.iexapis.com/stable/stock/BRK%2FB%3Fx%23y/quote?token=pk_test"
        );

        let url = build_segment_url("http://127.0.0.1:8080/proxy", &["records"], &[]).unwrap();
        assert_eq!(url, "http://127.0.0.1:8080/proxy/records");
    }

    #[test]
    fn test_segment_url_rejects_bad_base() {
        assert!(build_segment_url("not a url", &["quote"], &[]).is_err());
    }
}
