use serde::{Deserialize, Serialize};

/// Broad classification of a tradeable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Stock,
    Crypto,
    Etf,
    MutualFund,
    #[default]
    Other,
}

impl AssetKind {
    /// Map a market-data instrument type (e.g. `EQUITY`, `CRYPTOCURRENCY`) to a kind.
    pub fn from_instrument_type(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "EQUITY" => AssetKind::Stock,
            "CRYPTOCURRENCY" => AssetKind::Crypto,
            "ETF" => AssetKind::Etf,
            "MUTUALFUND" => AssetKind::MutualFund,
            _ => AssetKind::Other,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "stock" | "equity" => Some(AssetKind::Stock),
            "crypto" => Some(AssetKind::Crypto),
            "etf" => Some(AssetKind::Etf),
            "mutual_fund" | "fund" => Some(AssetKind::MutualFund),
            "other" => Some(AssetKind::Other),
            _ => None,
        }
    }
}

/// An entry in the asset registry. Trades may only reference registered symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub name: String,
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

impl Asset {
    pub fn new(symbol: &str, name: impl Into<String>, kind: AssetKind) -> Self {
        let symbol = normalize_symbol(symbol);
        let name = name.into();
        let name = if name.trim().is_empty() {
            symbol.clone()
        } else {
            name.trim().to_string()
        };
        Self {
            symbol,
            name,
            kind,
            exchange: None,
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }
}

/// Canonical form of a ticker: trimmed and upper-cased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
