use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::models::normalize_symbol;

use super::movers::{rank_movers, MarketMovers};
use super::{AssetProfile, MarketDataSource, MarketDataStore, PricePoint};

/// Source name recorded on hand-entered prices.
pub const MANUAL_SOURCE: &str = "manual";

/// Price lookups backed by the local store, filling gaps from an optional source.
pub struct MarketDataService {
    store: Arc<dyn MarketDataStore>,
    source: Option<Arc<dyn MarketDataSource>>,
    lookback_days: u32,
    clock: Arc<dyn Clock>,
}

impl MarketDataService {
    pub fn new(store: Arc<dyn MarketDataStore>, source: Option<Arc<dyn MarketDataSource>>) -> Self {
        Self {
            store,
            source,
            lookback_days: 7,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Latest known bar on or before `date`.
    ///
    /// A stored bar within the lookback window wins. Otherwise the window
    /// ending at `date` is fetched from the source and cached; if that yields
    /// nothing, an older stored bar is still returned. Source failures are
    /// logged and treated as "no new data".
    pub async fn price_as_of(&self, symbol: &str, date: NaiveDate) -> Result<Option<PricePoint>> {
        let symbol = normalize_symbol(symbol);
        let lookback = Duration::days(i64::from(self.lookback_days));

        let cached = self.store.get_price_on_or_before(&symbol, date).await?;
        if let Some(price) = &cached {
            if date - price.as_of_date <= lookback {
                debug!(symbol = %symbol, date = %price.as_of_date, close = %price.close, "price found in store");
                return Ok(cached);
            }
        }

        let Some(source) = &self.source else {
            return Ok(cached);
        };

        let end = date.min(self.clock.today());
        let start = end - lookback;
        let bars = match source.fetch_history(&symbol, start, end).await {
            Ok(bars) => bars,
            Err(err) => {
                warn!(symbol = %symbol, source = source.name(), error = %err, "price fetch failed");
                return Ok(cached);
            }
        };

        let fetched = bars
            .iter()
            .filter(|bar| bar.as_of_date <= date)
            .max_by_key(|bar| bar.as_of_date)
            .cloned();
        if !bars.is_empty() {
            self.store.put_prices(&bars).await?;
        }

        match fetched {
            Some(price) => {
                info!(
                    symbol = %symbol,
                    date = %price.as_of_date,
                    close = %price.close,
                    source = %price.source,
                    "price fetched and stored"
                );
                Ok(Some(price))
            }
            None => Ok(cached),
        }
    }

    /// Fetch daily bars for `[start, end]` and store them. Returns the number of bars stored.
    pub async fn sync_history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<usize> {
        let source = self
            .source
            .as_ref()
            .context("No market data source configured")?;
        let symbol = normalize_symbol(symbol);
        let bars = source
            .fetch_history(&symbol, start, end)
            .await
            .with_context(|| format!("Failed to fetch history for {symbol}"))?;
        self.store.put_prices(&bars).await?;
        info!(symbol = %symbol, start = %start, end = %end, stored = bars.len(), "synced price history");
        Ok(bars.len())
    }

    /// Stored bars for `[start, end]`, ascending.
    pub async fn history(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PricePoint>> {
        self.store.get_prices_between(symbol, start, end).await
    }

    /// Store a hand-entered close, replacing any bar for the same date.
    pub async fn record_price(&self, symbol: &str, date: NaiveDate, close: Decimal) -> Result<PricePoint> {
        if close <= Decimal::ZERO {
            anyhow::bail!("Price must be positive, got {close}");
        }
        let price = PricePoint::close_only(symbol, date, close, MANUAL_SOURCE, self.clock.now());
        self.store.put_prices(std::slice::from_ref(&price)).await?;
        info!(symbol = %price.symbol, date = %date, close = %close, "recorded manual price");
        Ok(price)
    }

    /// Profile from the source, `None` without a source or for unknown symbols.
    pub async fn fetch_profile(&self, symbol: &str) -> Result<Option<AssetProfile>> {
        match &self.source {
            Some(source) => source.fetch_profile(&normalize_symbol(symbol)).await,
            None => Ok(None),
        }
    }

    /// Rank `symbols` by intraday growth of their latest bar on or before `date`.
    pub async fn movers(&self, symbols: &[String], date: NaiveDate, n: usize) -> Result<MarketMovers> {
        let mut bars = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            match self.price_as_of(symbol, date).await? {
                Some(bar) => bars.push(bar),
                None => debug!(symbol = %symbol, "no bar for movers, skipping"),
            }
        }
        Ok(rank_movers(&bars, n))
    }
}
