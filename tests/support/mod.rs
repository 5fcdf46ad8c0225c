#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use holdbook::clock::{Clock, FixedClock};
use holdbook::market_data::{
    AssetProfile, MarketDataService, MarketDataSource, MarketDataStore, MemoryMarketDataStore,
    PricePoint,
};
use holdbook::models::{Asset, AssetKind};
use holdbook::portfolio::PortfolioService;
use holdbook::storage::{MemoryStorage, Storage};
use rust_decimal::Decimal;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap(),
    ))
}

pub fn close(symbol: &str, day: NaiveDate, price: &str) -> PricePoint {
    PricePoint::close_only(
        symbol,
        day,
        dec(price),
        "test",
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap(),
    )
}

/// Source that serves canned bars and profiles and counts calls.
#[derive(Default)]
pub struct MockMarketDataSource {
    bars: HashMap<String, Vec<PricePoint>>,
    profiles: HashMap<String, AssetProfile>,
    fail: bool,
    history_calls: AtomicUsize,
}

impl MockMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bar(mut self, bar: PricePoint) -> Self {
        self.bars.entry(bar.symbol.clone()).or_default().push(bar);
        self
    }

    pub fn with_profile(mut self, symbol: &str, name: &str, kind: AssetKind) -> Self {
        self.profiles.insert(
            symbol.to_string(),
            AssetProfile {
                symbol: symbol.to_string(),
                name: name.to_string(),
                kind,
                exchange: None,
            },
        );
        self
    }

    pub fn fail_on_fetch(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for MockMarketDataSource {
    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("mock source failure");
        }
        Ok(self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|bar| bar.as_of_date >= start && bar.as_of_date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<Option<AssetProfile>> {
        if self.fail {
            anyhow::bail!("mock source failure");
        }
        Ok(self.profiles.get(symbol).cloned())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// In-memory service wiring for tests.
pub struct Harness {
    pub storage: Arc<MemoryStorage>,
    pub store: Arc<MemoryMarketDataStore>,
    pub market_data: Arc<MarketDataService>,
    pub service: PortfolioService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_source(None)
    }

    pub fn with_source(source: Option<Arc<dyn MarketDataSource>>) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let store = Arc::new(MemoryMarketDataStore::new());
        let clock = fixed_clock();
        let market_data = Arc::new(
            MarketDataService::new(store.clone() as Arc<dyn MarketDataStore>, source)
                .with_clock(clock.clone()),
        );
        let service = PortfolioService::new(storage.clone() as Arc<dyn Storage>, market_data.clone())
            .with_clock(clock);
        Self {
            storage,
            store,
            market_data,
            service,
        }
    }

    pub async fn register(&self, symbol: &str, name: &str) -> Result<Asset> {
        self.service
            .add_asset(symbol, name, AssetKind::Stock, None)
            .await
    }

    pub async fn set_price(&self, symbol: &str, day: NaiveDate, price: &str) -> Result<()> {
        self.store.put_prices(&[close(symbol, day, price)]).await
    }
}
