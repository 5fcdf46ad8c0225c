mod json_file;
mod locks;
mod lookup;
mod memory;

pub use json_file::JsonFileStorage;
pub use locks::{LedgerLock, ScopeLocks};
pub use lookup::find_portfolio;
pub use memory::MemoryStorage;

use anyhow::Result;
use chrono::NaiveDate;

use crate::models::{sort_ledger, Asset, Id, LedgerScope, Portfolio, Transaction};

/// Persistence for portfolios, the asset registry and scope-keyed ledgers.
///
/// Ledgers are append-only. Implementations return entries in append order
/// from [`Storage::get_ledger`]; ordering by trade date happens in
/// [`Storage::get_transactions`].
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    // Portfolios
    async fn list_portfolios(&self) -> Result<Vec<Portfolio>>;
    async fn get_portfolio(&self, id: &Id) -> Result<Option<Portfolio>>;
    async fn save_portfolio(&self, portfolio: &Portfolio) -> Result<()>;

    // Asset registry, keyed by normalized symbol
    async fn list_assets(&self) -> Result<Vec<Asset>>;
    async fn get_asset(&self, symbol: &str) -> Result<Option<Asset>>;
    async fn save_asset(&self, asset: &Asset) -> Result<()>;
    async fn delete_asset(&self, symbol: &str) -> Result<bool>;

    // Ledger
    async fn get_ledger(&self, scope: &LedgerScope) -> Result<Vec<Transaction>>;
    async fn append_transaction(&self, scope: &LedgerScope, txn: &Transaction) -> Result<()>;

    /// Block until no other writer, in this process or another one, holds
    /// the ledger of `scope`. Callers hold the lock across read, validate
    /// and append.
    async fn lock_ledger(&self, scope: &LedgerScope) -> Result<LedgerLock>;

    /// Entries with `occurred_at <= cutoff`, ordered by date then append order.
    async fn get_transactions(
        &self,
        scope: &LedgerScope,
        cutoff: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let mut txns: Vec<Transaction> = self
            .get_ledger(scope)
            .await?
            .into_iter()
            .filter(|txn| txn.occurred_at <= cutoff)
            .collect();
        sort_ledger(&mut txns);
        Ok(txns)
    }

    /// Whether a ledger may be kept under `scope`.
    async fn scope_exists(&self, scope: &LedgerScope) -> Result<bool> {
        match scope {
            LedgerScope::Global => Ok(true),
            LedgerScope::Portfolio(id) => Ok(self.get_portfolio(id).await?.is_some()),
        }
    }
}
