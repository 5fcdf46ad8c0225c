//! In-memory storage implementation for testing.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{normalize_symbol, Asset, Id, LedgerScope, Portfolio, Transaction};

use super::{LedgerLock, ScopeLocks, Storage};

pub struct MemoryStorage {
    portfolios: Mutex<HashMap<Id, Portfolio>>,
    assets: Mutex<BTreeMap<String, Asset>>,
    ledgers: Mutex<HashMap<LedgerScope, Vec<Transaction>>>,
    writers: ScopeLocks,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            portfolios: Mutex::new(HashMap::new()),
            assets: Mutex::new(BTreeMap::new()),
            ledgers: Mutex::new(HashMap::new()),
            writers: ScopeLocks::new(),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        let portfolios = self.portfolios.lock().await;
        let mut list: Vec<Portfolio> = portfolios.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn get_portfolio(&self, id: &Id) -> Result<Option<Portfolio>> {
        let portfolios = self.portfolios.lock().await;
        Ok(portfolios.get(id).cloned())
    }

    async fn save_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        let mut portfolios = self.portfolios.lock().await;
        portfolios.insert(portfolio.id.clone(), portfolio.clone());
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        let assets = self.assets.lock().await;
        Ok(assets.values().cloned().collect())
    }

    async fn get_asset(&self, symbol: &str) -> Result<Option<Asset>> {
        let assets = self.assets.lock().await;
        Ok(assets.get(&normalize_symbol(symbol)).cloned())
    }

    async fn save_asset(&self, asset: &Asset) -> Result<()> {
        let mut assets = self.assets.lock().await;
        assets.insert(normalize_symbol(&asset.symbol), asset.clone());
        Ok(())
    }

    async fn delete_asset(&self, symbol: &str) -> Result<bool> {
        let mut assets = self.assets.lock().await;
        Ok(assets.remove(&normalize_symbol(symbol)).is_some())
    }

    async fn get_ledger(&self, scope: &LedgerScope) -> Result<Vec<Transaction>> {
        let ledgers = self.ledgers.lock().await;
        Ok(ledgers.get(scope).cloned().unwrap_or_default())
    }

    async fn append_transaction(&self, scope: &LedgerScope, txn: &Transaction) -> Result<()> {
        let mut ledgers = self.ledgers.lock().await;
        ledgers.entry(scope.clone()).or_default().push(txn.clone());
        Ok(())
    }

    async fn lock_ledger(&self, scope: &LedgerScope) -> Result<LedgerLock> {
        Ok(LedgerLock::new(self.writers.lock(scope).await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetKind, TradeSide};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn get_transactions_filters_by_cutoff_and_orders_by_date() -> Result<()> {
        let storage = MemoryStorage::new();
        let asset = Asset::new("AAPL", "Apple Inc.", AssetKind::Stock);
        let scope = LedgerScope::Global;
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();

        for (qty, date) in [(1, day(10)), (2, day(3)), (3, day(20)), (4, day(3))] {
            let txn = Transaction::new(
                scope.clone(),
                &asset,
                TradeSide::Buy,
                Decimal::from(qty),
                Decimal::ONE,
                date,
            );
            storage.append_transaction(&scope, &txn).await?;
        }

        let txns = storage.get_transactions(&scope, day(10)).await?;
        let quantities: Vec<Decimal> = txns.iter().map(|t| t.quantity).collect();
        assert_eq!(
            quantities,
            vec![Decimal::from(2), Decimal::from(4), Decimal::from(1)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn ledgers_are_isolated_by_scope() -> Result<()> {
        let storage = MemoryStorage::new();
        let asset = Asset::new("BTC", "Bitcoin", AssetKind::Crypto);
        let portfolio = LedgerScope::portfolio(Id::from("p1"));
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let txn = Transaction::new(
            portfolio.clone(),
            &asset,
            TradeSide::Buy,
            Decimal::ONE,
            Decimal::from(40_000),
            date,
        );
        storage.append_transaction(&portfolio, &txn).await?;

        assert_eq!(storage.get_ledger(&portfolio).await?.len(), 1);
        assert!(storage.get_ledger(&LedgerScope::Global).await?.is_empty());
        assert!(!storage.scope_exists(&portfolio).await?);
        assert!(storage.scope_exists(&LedgerScope::Global).await?);
        Ok(())
    }
}
