//! Core business logic abstractions

pub mod batch;
pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod fetch;
pub mod instrument;
pub mod log;
pub mod normalizer;
pub mod price;
pub mod resolver;

// Re-export main types for cleaner imports
pub use batch::{BatchOptions, BatchOrchestrator, BatchOutcome};
pub use cache::SnapshotCache;
pub use currency::CurrencyRateProvider;
pub use error::{FetchError, NormalizationError, StoreError};
pub use fetch::{FetchClient, FetchOptions};
pub use instrument::{AssetType, ExchangeRateTarget, Instrument, RateRecord, ResultRecord};
pub use normalizer::{ExchangeRateNormalizer, ExchangeRateTable, RateSet};
pub use price::{PriceProvider, PriceQuote};
pub use resolver::{ChainProviders, FallbackResolver};
