use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{normalize_symbol, Asset, AssetKind};

/// One daily bar for a symbol. `close` is the price used for valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub symbol: String,
    pub as_of_date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<Decimal>,
    pub close: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
    pub source: String,
}

impl PricePoint {
    /// A close-only point, as entered by hand.
    pub fn close_only(
        symbol: &str,
        as_of_date: NaiveDate,
        close: Decimal,
        source: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            as_of_date,
            timestamp,
            open: None,
            high: None,
            low: None,
            close,
            volume: None,
            source: source.into(),
        }
    }

    pub fn with_open(mut self, open: Decimal) -> Self {
        self.open = Some(open);
        self
    }
}

/// Descriptive data a source knows about a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetProfile {
    pub symbol: String,
    pub name: String,
    pub kind: AssetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
}

impl AssetProfile {
    pub fn into_asset(self) -> Asset {
        let asset = Asset::new(&self.symbol, self.name, self.kind);
        match self.exchange {
            Some(exchange) => asset.with_exchange(exchange),
            None => asset,
        }
    }
}
