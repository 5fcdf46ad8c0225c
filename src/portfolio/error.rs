use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::LedgerScope;

/// Failures of the accounting core.
///
/// Service methods return these wrapped in `anyhow::Error`; use
/// `err.downcast_ref::<AccountingError>()` to branch on the kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountingError {
    #[error("Insufficient holdings: {symbol} current {available}, attempting to sell {requested}")]
    InsufficientHoldings {
        symbol: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("No price data available for {symbol} on or before {cutoff}")]
    MissingPriceData { symbol: String, cutoff: NaiveDate },

    #[error("Unknown asset {0}; add it to the asset registry first")]
    UnknownAsset(String),

    #[error("Unknown ledger scope {0}")]
    UnknownScope(LedgerScope),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Invalid portfolio: {0}")]
    InvalidPortfolio(String),
}
