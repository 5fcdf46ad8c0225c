mod support;

use std::sync::Arc;

use anyhow::Result;
use holdbook::market_data::{JsonlMarketDataStore, MarketDataService, MarketDataStore};
use holdbook::models::{AssetKind, LedgerScope};
use holdbook::portfolio::PortfolioService;
use holdbook::storage::{JsonFileStorage, Storage};
use support::{close, date, dec, fixed_clock};
use tempfile::TempDir;

fn open(dir: &std::path::Path) -> PortfolioService {
    let clock = fixed_clock();
    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(dir));
    let store: Arc<dyn MarketDataStore> = Arc::new(JsonlMarketDataStore::new(dir));
    let market_data = Arc::new(MarketDataService::new(store, None).with_clock(clock.clone()));
    PortfolioService::new(storage, market_data).with_clock(clock)
}

#[tokio::test]
async fn ledger_survives_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let service = open(dir.path());
        service
            .add_asset("MSFT", "Microsoft", AssetKind::Stock, Some("NMS"))
            .await?;
        service
            .record_buy(&LedgerScope::Global, "MSFT", dec("4"), dec("300"), date(2024, 1, 2))
            .await?;
        service
            .record_sell(&LedgerScope::Global, "MSFT", dec("1"), dec("350"), date(2024, 2, 1))
            .await?;
    }

    JsonlMarketDataStore::new(dir.path())
        .put_prices(&[close("MSFT", date(2024, 6, 28), "400")])
        .await?;

    let service = open(dir.path());
    let report = service.report(&LedgerScope::Global, date(2024, 6, 30)).await?;
    let holding = &report.summary.holdings[0];
    assert_eq!(holding.quantity, dec("3"));
    assert_eq!(holding.realized_profit, dec("50"));
    assert_eq!(holding.market_value, dec("1200"));
    assert_eq!(holding.price_date, Some(date(2024, 6, 28)));

    assert!(
        dir.path().join("ledgers").exists(),
        "ledger directory is created under the data dir"
    );
    Ok(())
}

#[tokio::test]
async fn portfolio_ledgers_persist_separately() -> Result<()> {
    let dir = TempDir::new()?;
    let service = open(dir.path());
    service.add_asset("KO", "Coca-Cola", AssetKind::Stock, None).await?;

    let income = service.create_portfolio("Income", "dividend payers").await?;
    let scope = LedgerScope::portfolio(income.id.clone());
    service
        .record_buy(&scope, "KO", dec("10"), dec("60"), date(2024, 1, 2))
        .await?;

    let reopened = open(dir.path());
    let found = reopened.get_portfolio("income").await?.expect("portfolio");
    assert_eq!(found.id, income.id);

    let scoped = reopened.report(&scope, date(2024, 6, 30)).await?;
    assert_eq!(scoped.summary.holdings.len(), 1);
    let global = reopened.report(&LedgerScope::Global, date(2024, 6, 30)).await?;
    assert!(global.summary.holdings.is_empty());

    assert!(reopened
        .record_sell(&LedgerScope::Global, "KO", dec("1"), dec("61"), date(2024, 2, 1))
        .await
        .is_err());
    Ok(())
}

#[tokio::test]
async fn sells_from_separate_storages_on_one_dir_are_serialized() -> Result<()> {
    let dir = TempDir::new()?;
    let setup = open(dir.path());
    setup.add_asset("AAPL", "Apple Inc.", AssetKind::Stock, None).await?;
    setup
        .record_buy(&LedgerScope::Global, "AAPL", dec("10"), dec("100"), date(2024, 1, 2))
        .await?;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let service = open(dir.path());
        tasks.push(tokio::spawn(async move {
            service
                .record_sell(&LedgerScope::Global, "AAPL", dec("10"), dec("110"), date(2024, 1, 3))
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await? {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);

    let report = setup.report(&LedgerScope::Global, date(2024, 6, 30)).await?;
    assert!(report.summary.holdings.is_empty());
    assert_eq!(report.summary.total_realized_profit, dec("100"));
    Ok(())
}
