//! Sequential, rate-limited resolution of a whole instrument list.

use super::error::NormalizationError;
use super::instrument::{AssetType, ExchangeRateTarget, Instrument, RateRecord, ResultRecord};
use super::normalizer::ExchangeRateNormalizer;
use super::price::PriceQuote;
use super::resolver::FallbackResolver;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Pause before every instrument lookup.
    pub request_delay: Duration,
    /// Extra pause before crypto lookups.
    pub crypto_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            request_delay: Duration::from_secs(1),
            crypto_delay: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub prices: Vec<ResultRecord>,
    pub rates: Vec<RateRecord>,
    pub unresolved: Vec<Instrument>,
}

pub struct BatchOrchestrator {
    resolver: FallbackResolver,
    normalizer: ExchangeRateNormalizer,
    options: BatchOptions,
}

impl BatchOrchestrator {
    pub fn new(
        resolver: FallbackResolver,
        normalizer: ExchangeRateNormalizer,
        options: BatchOptions,
    ) -> Self {
        Self {
            resolver,
            normalizer,
            options,
        }
    }

    /// Resolves exchange rates, then every instrument in input order.
    ///
    /// A normalization failure aborts before any instrument is looked up.
    /// Instruments without a price are left out of `prices` and listed in
    /// `unresolved`. `on_progress` is called once per instrument.
    pub async fn run(
        &self,
        instruments: &[Instrument],
        targets: &[ExchangeRateTarget],
        on_progress: &(dyn Fn()),
    ) -> Result<BatchOutcome, NormalizationError> {
        let table = self.normalizer.resolve(targets).await?;
        let mut outcome = BatchOutcome {
            rates: table.records_for(targets),
            ..Default::default()
        };

        let total = instruments.len();
        for instrument in instruments {
            tokio::time::sleep(self.options.request_delay).await;
            if instrument.asset_type == AssetType::Crypto {
                tokio::time::sleep(self.options.crypto_delay).await;
            }

            match self
                .resolver
                .resolve(instrument.asset_type, &instrument.code)
                .await
            {
                PriceQuote::Found(price) => {
                    let multiplier =
                        table.multiplier_for(instrument.quote_currency_tag.as_deref());
                    outcome.prices.push(ResultRecord {
                        instrument_id: instrument.id.clone(),
                        code: instrument.code.clone(),
                        resolved_price: price,
                        applied_multiplier: multiplier,
                    });
                    info!(
                        code = %instrument.code,
                        asset_type = %instrument.asset_type,
                        price,
                        multiplier,
                        processed = outcome.prices.len(),
                        total,
                        "Resolved asset price"
                    );
                }
                PriceQuote::NotFound => {
                    warn!(
                        code = %instrument.code,
                        asset_type = %instrument.asset_type,
                        currency = ?instrument.quote_currency_tag,
                        processed = outcome.prices.len(),
                        total,
                        "Failed to resolve asset price"
                    );
                    outcome.unresolved.push(instrument.clone());
                }
            }
            on_progress();
        }

        Ok(outcome)
    }
}
