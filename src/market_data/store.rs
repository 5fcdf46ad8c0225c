use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::NaiveDate;

use super::PricePoint;
use crate::models::normalize_symbol;

/// Persisted daily bars, at most one per symbol and date.
#[async_trait::async_trait]
pub trait MarketDataStore: Send + Sync {
    /// The bar with the latest `as_of_date <= date`.
    async fn get_price_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>>;

    /// Bars with `start <= as_of_date <= end`, ascending by date.
    async fn get_prices_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>>;

    /// Insert or replace by symbol and date.
    async fn put_prices(&self, prices: &[PricePoint]) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryMarketDataStore {
    prices: tokio::sync::Mutex<HashMap<String, BTreeMap<NaiveDate, PricePoint>>>,
}

impl MemoryMarketDataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl MarketDataStore for MemoryMarketDataStore {
    async fn get_price_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>> {
        let prices = self.prices.lock().await;
        Ok(prices
            .get(&normalize_symbol(symbol))
            .and_then(|bars| bars.range(..=date).next_back())
            .map(|(_, bar)| bar.clone()))
    }

    async fn get_prices_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        if start > end {
            return Ok(Vec::new());
        }
        let prices = self.prices.lock().await;
        Ok(prices
            .get(&normalize_symbol(symbol))
            .map(|bars| bars.range(start..=end).map(|(_, bar)| bar.clone()).collect())
            .unwrap_or_default())
    }

    async fn put_prices(&self, prices: &[PricePoint]) -> Result<()> {
        if prices.is_empty() {
            return Ok(());
        }
        let mut store = self.prices.lock().await;
        for price in prices {
            store
                .entry(normalize_symbol(&price.symbol))
                .or_default()
                .insert(price.as_of_date, price.clone());
        }
        Ok(())
    }
}
