use std::fmt::Display;
use std::str::FromStr;

/// Classification tag that selects a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum AssetType {
    Crypto,
    HkEquity,
    UsEquity,
    CnEquity,
    Fund,
}

impl AssetType {
    pub const ALL: [AssetType; 5] = [
        AssetType::Crypto,
        AssetType::HkEquity,
        AssetType::UsEquity,
        AssetType::CnEquity,
        AssetType::Fund,
    ];

    /// The tag used for this type in the instruments datasheet.
    pub fn sheet_tag(&self) -> &'static str {
        match self {
            AssetType::Crypto => "加密货币",
            AssetType::HkEquity => "港股股票",
            AssetType::UsEquity => "美股股票",
            AssetType::CnEquity => "A股股票",
            AssetType::Fund => "基金ETF",
        }
    }
}

impl Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sheet_tag())
    }
}

impl FromStr for AssetType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(asset_type) = AssetType::ALL.into_iter().find(|t| t.sheet_tag() == s) {
            return Ok(asset_type);
        }
        match s.to_lowercase().as_str() {
            "crypto" => Ok(AssetType::Crypto),
            "hk" | "hk_equity" => Ok(AssetType::HkEquity),
            "us" | "us_equity" => Ok(AssetType::UsEquity),
            "cn" | "cn_equity" | "a_share" => Ok(AssetType::CnEquity),
            "fund" | "etf" => Ok(AssetType::Fund),
            _ => Err(anyhow::anyhow!("Unknown asset type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub id: String,
    pub code: String,
    pub asset_type: AssetType,
    pub quote_currency_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateTarget {
    pub id: String,
    pub currency_tag: String,
}

/// One successfully resolved instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub instrument_id: String,
    pub code: String,
    pub resolved_price: f64,
    pub applied_multiplier: f64,
}

impl ResultRecord {
    /// Price expressed in the reporting currency.
    pub fn normalized_price(&self) -> f64 {
        self.resolved_price * self.applied_multiplier
    }
}

/// Multiplier written back for one exchange rate target.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRecord {
    pub target_id: String,
    pub currency_tag: String,
    pub multiplier: f64,
}
