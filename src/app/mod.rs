//! Command implementations shared by the CLI. Each returns a JSON value for stdout.

mod assets;
mod config;
mod portfolio;
mod prices;
mod trades;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::clock::{Clock, SystemClock};
use crate::config::{PriceSourceKind, ResolvedConfig};
use crate::market_data::{JsonlMarketDataStore, MarketDataService, MarketDataSource, MarketDataStore};
use crate::models::LedgerScope;
use crate::portfolio::{AccountingError, PortfolioService};
use crate::storage::{find_portfolio, JsonFileStorage, Storage};

pub use assets::{add_asset, list_assets, remove_asset, show_asset, sync_asset};
pub use config::config_output;
pub use portfolio::{create_portfolio, list_portfolios, show_portfolio, update_portfolio};
pub use prices::{market_movers, price_history, set_price, sync_prices};
pub use trades::{holdings, record_trade, TradeRequest};

/// Wired services for one data directory.
pub struct App {
    pub config: ResolvedConfig,
    pub storage: Arc<dyn Storage>,
    pub market_data: Arc<MarketDataService>,
    pub portfolio: PortfolioService,
    pub clock: Arc<dyn Clock>,
}

impl App {
    /// File-backed storage and price store under the configured data directory.
    pub fn open(config: ResolvedConfig) -> Result<Self> {
        let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));
        let store: Arc<dyn MarketDataStore> = Arc::new(JsonlMarketDataStore::new(&config.data_dir));
        let source = build_source(&config)?;
        Ok(Self::with_parts(config, storage, store, source, Arc::new(SystemClock)))
    }

    pub fn with_parts(
        config: ResolvedConfig,
        storage: Arc<dyn Storage>,
        store: Arc<dyn MarketDataStore>,
        source: Option<Arc<dyn MarketDataSource>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let market_data = Arc::new(
            MarketDataService::new(store, source)
                .with_lookback_days(config.market_data.lookback_days)
                .with_clock(clock.clone()),
        );
        let portfolio = PortfolioService::new(storage.clone(), market_data.clone())
            .with_clock(clock.clone());
        Self {
            config,
            storage,
            market_data,
            portfolio,
            clock,
        }
    }

    /// `None` is the global ledger; otherwise a portfolio id or unambiguous name.
    pub async fn resolve_scope(&self, portfolio: Option<&str>) -> Result<LedgerScope> {
        let Some(id_or_name) = portfolio else {
            return Ok(LedgerScope::Global);
        };
        match find_portfolio(self.storage.as_ref(), id_or_name).await? {
            Some(found) => Ok(LedgerScope::portfolio(found.id)),
            None => {
                let scope = LedgerScope::from_portfolio_arg(Some(id_or_name))
                    .with_context(|| format!("Invalid portfolio: {id_or_name}"))?;
                Err(AccountingError::UnknownScope(scope).into())
            }
        }
    }

    pub fn date_or_today(&self, value: Option<&str>) -> Result<NaiveDate> {
        match value {
            Some(value) => parse_date(value),
            None => Ok(self.clock.today()),
        }
    }
}

#[cfg(feature = "market_data")]
fn build_source(config: &ResolvedConfig) -> Result<Option<Arc<dyn MarketDataSource>>> {
    use crate::market_data::providers::YahooChartSource;

    match config.market_data.source {
        PriceSourceKind::None => Ok(None),
        PriceSourceKind::Yahoo => {
            let source = YahooChartSource::from_config(&config.market_data)?;
            Ok(Some(Arc::new(source)))
        }
    }
}

#[cfg(not(feature = "market_data"))]
fn build_source(config: &ResolvedConfig) -> Result<Option<Arc<dyn MarketDataSource>>> {
    match config.market_data.source {
        PriceSourceKind::None => Ok(None),
        other => anyhow::bail!(
            "Price source {other:?} needs the `market_data` feature"
        ),
    }
}

pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date: {value}. Use YYYY-MM-DD"))
}

pub fn parse_decimal(value: &str, what: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim()).with_context(|| format!("Invalid {what}: {value}"))
}
