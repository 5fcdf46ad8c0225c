mod error;
mod holdings;
mod lots;
mod models;
mod service;

pub use error::AccountingError;
pub use holdings::{
    aggregate, Holding, HoldingsSummary, PriceFallback, PriceWarning, ResolvedPrice, TotalsMode,
};
pub use lots::{match_by_asset, match_lots, Lot, LotMatch, LotMatcher, MatchedAsset};
pub use models::{HoldingOutput, PortfolioReport, ReportOutput};
pub use service::PortfolioService;
