use super::batch::BatchOptions;
use super::fetch::FetchOptions;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const SHEET_TOKEN_ENV: &str = "QUOTESYNC_SHEET_TOKEN";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            base_url: "http://127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IexConfig {
    pub base_url: String,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DanjuanConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_coingecko")]
    pub coingecko: CoinGeckoConfig,
    #[serde(default = "default_iex")]
    pub iex: IexConfig,
    #[serde(default = "default_danjuan")]
    pub danjuan: DanjuanConfig,
}

fn default_coingecko() -> CoinGeckoConfig {
    CoinGeckoConfig {
        base_url: "https://api.coingecko.com".to_string(),
        api_key: None,
    }
}

fn default_iex() -> IexConfig {
    IexConfig {
        base_url: "https://api.iex.cloud".to_string(),
        token: None,
    }
}

fn default_danjuan() -> DanjuanConfig {
    DanjuanConfig {
        base_url: "https://danjuanfunds.com".to_string(),
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: default_coingecko(),
            iex: default_iex(),
            danjuan: default_danjuan(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SheetConfig {
    #[serde(default = "default_sheet_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
    pub instruments_datasheet: String,
    pub rates_datasheet: String,
    pub view_id: Option<String>,
}

fn default_sheet_url() -> String {
    "https://api.vika.cn".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub retries: usize,
    pub backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_ms: 10_000,
            retries: 3,
            backoff_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BatchConfig {
    pub request_delay_ms: u64,
    pub crypto_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            request_delay_ms: 1_000,
            crypto_delay_ms: 3_000,
        }
    }
}

fn default_cache_ttl_ms() -> u64 {
    60 * 60 * 1000
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub sheet: SheetConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("cn", "quotesync", "quotesync")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        if let Ok(token) = std::env::var(SHEET_TOKEN_ENV) {
            debug!("Using sheet token from {}", SHEET_TOKEN_ENV);
            config.sheet.token = token;
        }
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_millis(self.fetch.timeout_ms),
            retries: self.fetch.retries,
            backoff: Duration::from_millis(self.fetch.backoff_ms),
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            request_delay: Duration::from_millis(self.batch.request_delay_ms),
            crypto_delay: Duration::from_millis(self.batch.crypto_delay_ms),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}
