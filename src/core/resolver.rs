//! Ordered per-asset-type fallback chains.

use super::instrument::AssetType;
use super::price::{PriceProvider, PriceQuote};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// How an instrument code is rewritten before it reaches a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeTransform {
    AsIs,
    /// Text after the last `.`, e.g. `105.AAPL` -> `AAPL`.
    LastSegment,
    /// Text before the first `.`, e.g. `600519.SH` -> `600519`.
    StripSuffix,
}

impl CodeTransform {
    pub fn apply<'a>(&self, code: &'a str) -> &'a str {
        match self {
            CodeTransform::AsIs => code,
            CodeTransform::LastSegment => code.rsplit('.').next().unwrap_or(code),
            CodeTransform::StripSuffix => code.split('.').next().unwrap_or(code),
        }
    }
}

#[derive(Clone)]
pub struct ChainLink {
    pub provider: Arc<dyn PriceProvider>,
    pub transform: CodeTransform,
}

impl ChainLink {
    pub fn new(provider: Arc<dyn PriceProvider>, transform: CodeTransform) -> Self {
        Self {
            provider,
            transform,
        }
    }

    pub fn as_is(provider: Arc<dyn PriceProvider>) -> Self {
        Self::new(provider, CodeTransform::AsIs)
    }
}

/// The adapters that make up the standard chains.
pub struct ChainProviders {
    pub crypto_spot: Arc<dyn PriceProvider>,
    pub hk_minute: Arc<dyn PriceProvider>,
    pub us_quote: Arc<dyn PriceProvider>,
    pub us_minute: Arc<dyn PriceProvider>,
    pub cn_snapshot: Arc<dyn PriceProvider>,
    pub etf_category: Arc<dyn PriceProvider>,
    pub lof_category: Arc<dyn PriceProvider>,
    pub closed_fund_category: Arc<dyn PriceProvider>,
    pub etf_spot: Arc<dyn PriceProvider>,
    pub lof_spot: Arc<dyn PriceProvider>,
    pub open_fund_nav: Arc<dyn PriceProvider>,
    pub third_party_nav: Arc<dyn PriceProvider>,
}

/// Walks the chain declared for an asset type until a provider finds a price.
///
/// Every provider is asked at most once per `resolve` call; transport retries
/// happen inside the fetch layer, never here.
#[derive(Default)]
pub struct FallbackResolver {
    chains: HashMap<AssetType, Vec<ChainLink>>,
}

impl FallbackResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(mut self, asset_type: AssetType, links: Vec<ChainLink>) -> Self {
        self.chains.insert(asset_type, links);
        self
    }

    pub fn standard(p: ChainProviders) -> Self {
        Self::new()
            .with_chain(AssetType::Crypto, vec![ChainLink::as_is(p.crypto_spot)])
            .with_chain(AssetType::HkEquity, vec![ChainLink::as_is(p.hk_minute)])
            .with_chain(
                AssetType::UsEquity,
                vec![
                    ChainLink::new(p.us_quote, CodeTransform::LastSegment),
                    ChainLink::as_is(p.us_minute),
                ],
            )
            .with_chain(
                AssetType::CnEquity,
                vec![ChainLink::new(p.cn_snapshot, CodeTransform::StripSuffix)],
            )
            .with_chain(
                AssetType::Fund,
                vec![
                    ChainLink::as_is(p.etf_category),
                    ChainLink::as_is(p.lof_category),
                    ChainLink::as_is(p.closed_fund_category),
                    ChainLink::as_is(p.etf_spot),
                    ChainLink::as_is(p.lof_spot),
                    ChainLink::as_is(p.open_fund_nav),
                    ChainLink::as_is(p.third_party_nav),
                ],
            )
    }

    pub fn chain(&self, asset_type: AssetType) -> &[ChainLink] {
        self.chains
            .get(&asset_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub async fn resolve(&self, asset_type: AssetType, code: &str) -> PriceQuote {
        let chain = self.chain(asset_type);
        if chain.is_empty() {
            warn!("No providers configured for asset type {}", asset_type);
            return PriceQuote::NotFound;
        }

        for link in chain {
            let provider_code = link.transform.apply(code);
            let quote = link.provider.lookup(provider_code).await;
            if quote.is_found() {
                debug!(
                    provider = link.provider.id(),
                    code, provider_code, ?quote, "Resolved price"
                );
                return quote;
            }
        }

        debug!(%asset_type, code, "Fallback chain exhausted");
        PriceQuote::NotFound
    }
}
