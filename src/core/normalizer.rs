//! Resolves the currency multiplier table applied to every resolved price.

use super::currency::CurrencyRateProvider;
use super::error::{FailedPair, NormalizationError};
use super::instrument::{ExchangeRateTarget, RateRecord};
use super::price::PriceQuote;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether the provider quotes a pair as `foreign/reporting` or the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteDirection {
    /// `foreign/reporting`: the quoted rate is the multiplier.
    Direct,
    /// `reporting/foreign`: the multiplier is the reciprocal.
    Inverse,
}

#[derive(Debug, Clone)]
pub struct RatePair {
    pub currency_tag: String,
    pub from: String,
    pub to: String,
    pub direction: QuoteDirection,
    /// Decimal places kept in the multiplier.
    pub precision: u32,
}

impl RatePair {
    pub fn new(
        currency_tag: &str,
        from: &str,
        to: &str,
        direction: QuoteDirection,
        precision: u32,
    ) -> Self {
        Self {
            currency_tag: currency_tag.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            direction,
            precision,
        }
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.from, self.to)
    }
}

#[derive(Debug, Clone)]
pub struct RateSet {
    pub reporting_tag: String,
    pub pairs: Vec<RatePair>,
}

impl Default for RateSet {
    fn default() -> Self {
        use QuoteDirection::{Direct, Inverse};
        RateSet {
            reporting_tag: "人民币".to_string(),
            pairs: vec![
                RatePair::new("美元", "USD", "CNY", Direct, 3),
                RatePair::new("港币", "HKD", "CNY", Direct, 3),
                RatePair::new("欧元", "EUR", "CNY", Direct, 3),
                RatePair::new("泰铢", "CNY", "THB", Inverse, 3),
                RatePair::new("韩币", "CNY", "KRW", Inverse, 5),
            ],
        }
    }
}

/// Rounds `value` to `places` decimal places.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Multipliers into the reporting currency, keyed by currency tag.
///
/// Only ever built complete: every configured pair plus the reporting currency.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateTable {
    rates: BTreeMap<String, f64>,
}

impl ExchangeRateTable {
    pub fn get(&self, currency_tag: &str) -> Option<f64> {
        self.rates.get(currency_tag).copied()
    }

    /// Multiplier for an instrument's quote currency. Untagged instruments, and
    /// tags without a configured pair, are taken as already in the reporting currency.
    pub fn multiplier_for(&self, currency_tag: Option<&str>) -> f64 {
        match currency_tag {
            None => 1.0,
            Some(tag) => self.get(tag).unwrap_or_else(|| {
                warn!("No exchange rate for currency tag {}, using 1.0", tag);
                1.0
            }),
        }
    }

    /// One record per target whose tag has a multiplier.
    pub fn records_for(&self, targets: &[ExchangeRateTarget]) -> Vec<RateRecord> {
        targets
            .iter()
            .filter_map(|target| {
                self.get(&target.currency_tag).map(|multiplier| RateRecord {
                    target_id: target.id.clone(),
                    currency_tag: target.currency_tag.clone(),
                    multiplier,
                })
            })
            .collect()
    }
}

pub struct ExchangeRateNormalizer {
    provider: Arc<dyn CurrencyRateProvider>,
    rate_set: RateSet,
}

impl ExchangeRateNormalizer {
    pub fn new(provider: Arc<dyn CurrencyRateProvider>, rate_set: RateSet) -> Self {
        Self { provider, rate_set }
    }

    /// Fetches every configured pair and builds the table.
    ///
    /// Direct and inverse pairs are requested as two concurrent groups. If any
    /// pair fails or yields a non-positive rate, no table is produced.
    pub async fn resolve(
        &self,
        targets: &[ExchangeRateTarget],
    ) -> Result<ExchangeRateTable, NormalizationError> {
        let (direct, inverse): (Vec<&RatePair>, Vec<&RatePair>) = self
            .rate_set
            .pairs
            .iter()
            .partition(|p| p.direction == QuoteDirection::Direct);

        let (direct_results, inverse_results) = futures::join!(
            join_all(direct.iter().map(|pair| self.fetch_multiplier(pair))),
            join_all(inverse.iter().map(|pair| self.fetch_multiplier(pair)))
        );

        let mut rates = BTreeMap::new();
        rates.insert(self.rate_set.reporting_tag.clone(), 1.0);
        let mut failed = Vec::new();

        for (pair, result) in direct
            .iter()
            .zip(direct_results)
            .chain(inverse.iter().zip(inverse_results))
        {
            match result {
                Ok(multiplier) => {
                    rates.insert(pair.currency_tag.clone(), multiplier);
                }
                Err(failure) => failed.push(failure),
            }
        }

        if !failed.is_empty() {
            return Err(NormalizationError { failed });
        }

        for target in targets {
            if !rates.contains_key(&target.currency_tag) {
                warn!(
                    record_id = %target.id,
                    "No configured exchange rate for currency tag {}", target.currency_tag
                );
            }
        }

        info!(?rates, "Resolved exchange rates");
        Ok(ExchangeRateTable { rates })
    }

    async fn fetch_multiplier(&self, pair: &RatePair) -> Result<f64, FailedPair> {
        let failure = |reason: String| FailedPair {
            pair: pair.label(),
            reason,
        };

        let rate = match self.provider.get_rate(&pair.from, &pair.to).await {
            Ok(PriceQuote::Found(rate)) => rate,
            Ok(PriceQuote::NotFound) => return Err(failure("rate not found".to_string())),
            Err(e) => return Err(failure(e.to_string())),
        };

        let multiplier = match pair.direction {
            QuoteDirection::Direct => rate,
            QuoteDirection::Inverse => 1.0 / rate,
        };
        let multiplier = round_to(multiplier, pair.precision);
        if !(multiplier.is_finite() && multiplier > 0.0) {
            return Err(failure(format!("non-positive multiplier {multiplier}")));
        }

        debug!(pair = %pair.label(), rate, multiplier, "Resolved exchange rate");
        Ok(multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table; `None` answers not-found, missing pairs error.
    struct MockRateProvider {
        rates: HashMap<String, Option<f64>>,
        requested: Mutex<Vec<String>>,
    }

    impl MockRateProvider {
        fn new(rates: &[(&str, Option<f64>)]) -> Arc<Self> {
            Arc::new(Self {
                rates: rates
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CurrencyRateProvider for MockRateProvider {
        async fn get_rate(&self, from: &str, to: &str) -> Result<PriceQuote> {
            let pair = format!("{from}/{to}");
            self.requested.lock().unwrap().push(pair.clone());
            match self.rates.get(&pair) {
                Some(v) => Ok(match v {
                    Some(v) => PriceQuote::Found(*v),
                    None => PriceQuote::NotFound,
                }),
                None => Err(anyhow!("HTTP error: 502 Bad Gateway")),
            }
        }
    }

    const ALL_RATES: [(&str, Option<f64>); 5] = [
        ("USD/CNY", Some(7.123)),
        ("HKD/CNY", Some(0.9132)),
        ("EUR/CNY", Some(7.7351)),
        ("CNY/THB", Some(0.1865)),
        ("CNY/KRW", Some(189.53)),
    ];

    fn targets(tags: &[&str]) -> Vec<ExchangeRateTarget> {
        tags.iter()
            .enumerate()
            .map(|(i, tag)| ExchangeRateTarget {
                id: format!("rec{i}"),
                currency_tag: tag.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.0 / 0.1865, 3), 5.362);
        assert_eq!(round_to(7.12349, 3), 7.123);
        assert_eq!(round_to(1.0 / 189.53, 5), 0.00528);
    }

    #[tokio::test]
    async fn test_resolves_direct_and_inverse_pairs() {
        let provider = MockRateProvider::new(&ALL_RATES);
        let normalizer = ExchangeRateNormalizer::new(provider.clone(), RateSet::default());

        let table = normalizer
            .resolve(&targets(&["美元", "泰铢"]))
            .await
            .unwrap();

        assert_eq!(table.get("人民币"), Some(1.0));
        assert_eq!(table.get("美元"), Some(7.123));
        assert_eq!(table.get("港币"), Some(0.913));
        assert_eq!(table.get("欧元"), Some(7.735));
        assert_eq!(table.get("泰铢"), Some(5.362));
        assert_eq!(table.get("韩币"), Some(0.00528));

        // The reporting currency is never requested
        let requested = provider.requested.lock().unwrap();
        assert_eq!(requested.len(), 5);
        assert!(requested.iter().all(|p| p != "CNY/CNY"));
    }

    #[tokio::test]
    async fn test_any_failed_pair_fails_the_whole_table() {
        for (failing_pair, _) in ALL_RATES {
            for answer in [None, Some(-1.0)] {
                let rates: Vec<(&str, Option<f64>)> = ALL_RATES
                    .iter()
                    .map(|(pair, rate)| {
                        if *pair == failing_pair {
                            (*pair, answer)
                        } else {
                            (*pair, *rate)
                        }
                    })
                    .collect();
                let provider = MockRateProvider::new(&rates);
                let normalizer = ExchangeRateNormalizer::new(provider, RateSet::default());

                let err = normalizer.resolve(&targets(&["美元"])).await.unwrap_err();
                assert_eq!(err.failed.len(), 1, "pair {failing_pair}");
                assert_eq!(err.failed[0].pair, failing_pair);
            }
        }
    }

    #[tokio::test]
    async fn test_transport_error_fails_the_table() {
        let rates: Vec<(&str, Option<f64>)> = ALL_RATES
            .iter()
            .filter(|(pair, _)| *pair != "CNY/KRW")
            .copied()
            .collect();
        let normalizer =
            ExchangeRateNormalizer::new(MockRateProvider::new(&rates), RateSet::default());

        let err = normalizer.resolve(&[]).await.unwrap_err();
        assert_eq!(err.failed[0].pair, "CNY/KRW");
        assert!(err.to_string().contains("502 Bad Gateway"));
    }

    #[tokio::test]
    async fn test_records_and_multipliers() {
        let normalizer =
            ExchangeRateNormalizer::new(MockRateProvider::new(&ALL_RATES), RateSet::default());
        let targets = targets(&["美元", "泰铢", "比索"]);

        let table = normalizer.resolve(&targets).await.unwrap();
        let records = table.records_for(&targets);

        assert_eq!(
            records,
            vec![
                RateRecord {
                    target_id: "rec0".to_string(),
                    currency_tag: "美元".to_string(),
                    multiplier: 7.123,
                },
                RateRecord {
                    target_id: "rec1".to_string(),
                    currency_tag: "泰铢".to_string(),
                    multiplier: 5.362,
                },
            ]
        );
        assert_eq!(table.multiplier_for(None), 1.0);
        assert_eq!(table.multiplier_for(Some("比索")), 1.0);
        assert_eq!(table.multiplier_for(Some("港币")), 0.913);
    }
}
