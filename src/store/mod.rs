//! Record store holding the instrument and exchange-rate datasheets.

pub mod memory;
pub mod vika;

use crate::core::error::StoreError;
use crate::core::instrument::{
    AssetType, ExchangeRateTarget, Instrument, RateRecord, ResultRecord,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

pub use memory::MemoryStore;
pub use vika::VikaStore;

/// Largest number of records the store accepts in one update call.
pub const UPDATE_CHUNK_SIZE: usize = 10;

/// Column names used in the datasheets.
pub mod fields {
    pub const CODE: &str = "code";
    pub const ASSET_TYPE: &str = "Type";
    pub const CURRENCY: &str = "exchange_name";
    pub const TITLE: &str = "标题";
    pub const NEW_PRICE: &str = "new_price";
    pub const NEW_EXCHANGE_PRICE: &str = "new_exchange_price";
    pub const RATE_TO_CNY: &str = "汇率（对人民币）";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetRecord {
    #[serde(rename = "recordId")]
    pub record_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl SheetRecord {
    pub fn new(record_id: &str, fields: Value) -> Self {
        SheetRecord {
            record_id: record_id.to_string(),
            fields: match fields {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    /// A field rendered as trimmed text; empty values count as missing.
    pub fn text(&self, name: &str) -> Option<String> {
        let text = match self.fields.get(name)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            // Select fields may come back as a one-element list
            Value::Array(items) => match items.first()? {
                Value::String(s) => s.trim().to_string(),
                _ => return None,
            },
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }
}

#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Every record of `datasheet`, across all pages.
    async fn query_all(&self, datasheet: &str) -> Result<Vec<SheetRecord>, StoreError>;

    /// Writes `records` in a single call. Callers keep batches within
    /// [`UPDATE_CHUNK_SIZE`].
    async fn update(&self, datasheet: &str, records: &[SheetRecord]) -> Result<(), StoreError>;
}

/// Writes `records` as consecutive chunks of at most `chunk_size`.
///
/// Chunks are sent in order; the first failure stops the remaining chunks
/// and earlier ones stay written. Returns the number of records written.
pub async fn update_in_chunks(
    store: &dyn SheetStore,
    datasheet: &str,
    records: &[SheetRecord],
    chunk_size: usize,
) -> Result<usize, StoreError> {
    let mut written = 0;
    for chunk in records.chunks(chunk_size.max(1)) {
        store.update(datasheet, chunk).await?;
        written += chunk.len();
        debug!(datasheet, written, total = records.len(), "Updated chunk");
    }
    Ok(written)
}

/// Instruments from the instruments datasheet, skipping unusable rows.
pub fn parse_instruments(records: &[SheetRecord]) -> Vec<Instrument> {
    records
        .iter()
        .filter_map(|record| {
            let code = record.text(fields::CODE);
            let type_tag = record.text(fields::ASSET_TYPE);
            let (Some(code), Some(type_tag)) = (code, type_tag) else {
                warn!(
                    record_id = %record.record_id,
                    code = ?record.text(fields::CODE),
                    asset_type = ?record.text(fields::ASSET_TYPE),
                    "Missing required fields"
                );
                return None;
            };
            let asset_type = match type_tag.parse::<AssetType>() {
                Ok(asset_type) => asset_type,
                Err(e) => {
                    warn!(record_id = %record.record_id, code = %code, "{}", e);
                    return None;
                }
            };
            Some(Instrument {
                id: record.record_id.clone(),
                code,
                asset_type,
                quote_currency_tag: record.text(fields::CURRENCY),
            })
        })
        .collect()
}

/// Exchange rate targets from the rates datasheet.
pub fn parse_rate_targets(records: &[SheetRecord]) -> Vec<ExchangeRateTarget> {
    records
        .iter()
        .filter_map(|record| match record.text(fields::TITLE) {
            Some(currency_tag) => Some(ExchangeRateTarget {
                id: record.record_id.clone(),
                currency_tag,
            }),
            None => {
                warn!(record_id = %record.record_id, "Exchange rate row has no title");
                None
            }
        })
        .collect()
}

pub fn price_updates(prices: &[ResultRecord]) -> Vec<SheetRecord> {
    prices
        .iter()
        .map(|p| SheetRecord {
            record_id: p.instrument_id.clone(),
            fields: Map::from_iter([
                (fields::NEW_PRICE.to_string(), json!(p.resolved_price)),
                (fields::NEW_EXCHANGE_PRICE.to_string(), json!(p.applied_multiplier)),
            ]),
        })
        .collect()
}

pub fn rate_updates(rates: &[RateRecord]) -> Vec<SheetRecord> {
    rates
        .iter()
        .map(|r| SheetRecord {
            record_id: r.target_id.clone(),
            fields: Map::from_iter([(fields::RATE_TO_CNY.to_string(), json!(r.multiplier))]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, fields: Value) -> SheetRecord {
        SheetRecord::new(id, fields)
    }

    #[tokio::test]
    async fn test_update_in_chunks_preserves_record_ids() {
        let store = MemoryStore::new();
        let records: Vec<SheetRecord> = (0..23)
            .map(|i| record(&format!("rec{i:02}"), json!({ "new_price": i })))
            .collect();

        let written = update_in_chunks(&store, "dstPrices", &records, UPDATE_CHUNK_SIZE)
            .await
            .unwrap();

        assert_eq!(written, 23);
        let calls = store.update_calls("dstPrices").await;
        assert_eq!(
            calls.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![10, 10, 3]
        );
        let ids: Vec<String> = calls.concat().into_iter().map(|r| r.record_id).collect();
        let expected: Vec<String> = records.iter().map(|r| r.record_id.clone()).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_update_in_chunks_with_nothing_to_write() {
        let store = MemoryStore::new();
        let written = update_in_chunks(&store, "dstPrices", &[], UPDATE_CHUNK_SIZE)
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(store.update_calls("dstPrices").await.is_empty());
    }

    #[test]
    fn test_parse_instruments_skips_unusable_rows() {
        let records = vec![
            record("rec1", json!({"code": "510300", "Type": "基金ETF", "exchange_name": "人民币"})),
            record("rec2", json!({"code": "bitcoin", "Type": ["加密货币"], "exchange_name": "美元"})),
            record("rec3", json!({"Type": "港股股票"})),
            record("rec4", json!({"code": "00700", "Type": "债券"})),
            record("rec5", json!({"code": 600519, "Type": "A股股票"})),
            record("rec6", json!({"code": "  ", "Type": "A股股票"})),
        ];

        let instruments = parse_instruments(&records);

        assert_eq!(instruments.len(), 3);
        assert_eq!(instruments[0].asset_type, AssetType::Fund);
        assert_eq!(instruments[0].quote_currency_tag.as_deref(), Some("人民币"));
        assert_eq!(instruments[1].asset_type, AssetType::Crypto);
        assert_eq!(instruments[2].id, "rec5");
        assert_eq!(instruments[2].code, "600519");
        assert!(instruments[2].quote_currency_tag.is_none());
    }

    #[test]
    fn test_parse_rate_targets() {
        let records = vec![
            record("rate1", json!({"标题": "美元", "汇率（对人民币）": 7.1})),
            record("rate2", json!({})),
        ];

        let targets = parse_rate_targets(&records);
        assert_eq!(
            targets,
            vec![ExchangeRateTarget {
                id: "rate1".to_string(),
                currency_tag: "美元".to_string(),
            }]
        );
    }

    #[test]
    fn test_update_payloads() {
        let prices = price_updates(&[ResultRecord {
            instrument_id: "rec1".to_string(),
            code: "bitcoin".to_string(),
            resolved_price: 67000.0,
            applied_multiplier: 7.123,
        }]);
        assert_eq!(
            serde_json::to_value(&prices[0]).unwrap(),
            json!({"recordId": "rec1", "fields": {"new_price": 67000.0, "new_exchange_price": 7.123}})
        );

        let rates = rate_updates(&[RateRecord {
            target_id: "rate1".to_string(),
            currency_tag: "泰铢".to_string(),
            multiplier: 5.362,
        }]);
        assert_eq!(rates[0].record_id, "rate1");
        assert_eq!(rates[0].fields["汇率（对人民币）"], json!(5.362));
    }
}
