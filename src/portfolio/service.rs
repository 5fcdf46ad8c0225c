use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::market_data::MarketDataService;
use crate::models::{
    normalize_symbol, portfolio_name_problem, sort_ledger, Asset, AssetKind, Id, IdGenerator,
    LedgerScope, Portfolio, TradeSide, Transaction, UuidIdGenerator,
};
use crate::storage::{find_portfolio, Storage};

use super::{
    aggregate, match_by_asset, match_lots, AccountingError, LotMatcher, PortfolioReport,
    ResolvedPrice, TotalsMode,
};

/// Records trades against scope ledgers and reports holdings from them.
pub struct PortfolioService {
    storage: Arc<dyn Storage>,
    market_data: Arc<MarketDataService>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    totals_mode: TotalsMode,
}

impl PortfolioService {
    pub fn new(storage: Arc<dyn Storage>, market_data: Arc<MarketDataService>) -> Self {
        Self {
            storage,
            market_data,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGenerator),
            totals_mode: TotalsMode::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_totals_mode(mut self, mode: TotalsMode) -> Self {
        self.totals_mode = mode;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // Trades

    /// Record a buy. The ledger with the buy added must still replay, so a
    /// cost outside the decimal range is rejected before anything is written.
    pub async fn record_buy(
        &self,
        scope: &LedgerScope,
        symbol: &str,
        quantity: Decimal,
        price: Decimal,
        date: NaiveDate,
    ) -> Result<Transaction> {
        check_order(symbol, quantity, price)?;
        let asset = self.registered_asset(symbol).await?;
        self.ensure_scope(scope).await?;

        let _lock = self.storage.lock_ledger(scope).await?;

        let txn = self.new_transaction(scope, &asset, TradeSide::Buy, quantity, price, date);
        self.check_replay(scope, &txn).await?;

        self.storage
            .append_transaction(scope, &txn)
            .await
            .with_context(|| format!("Failed to record buy of {}", asset.symbol))?;

        info!(scope = %scope, symbol = %asset.symbol, %quantity, %price, %date, "recorded buy");
        Ok(txn)
    }

    /// Record a sell after checking it against the ledger.
    ///
    /// The sell must be covered by holdings on its own date, and must not
    /// leave any later sell in the ledger uncovered. The scope's ledger is
    /// locked from the read through the append.
    pub async fn record_sell(
        &self,
        scope: &LedgerScope,
        symbol: &str,
        quantity: Decimal,
        price: Decimal,
        date: NaiveDate,
    ) -> Result<Transaction> {
        check_order(symbol, quantity, price)?;
        let asset = self.registered_asset(symbol).await?;
        self.ensure_scope(scope).await?;

        let _lock = self.storage.lock_ledger(scope).await?;

        let ledger = self.asset_ledger(scope, &asset.symbol).await?;
        let mut matcher = LotMatcher::new(asset.symbol.clone());
        for txn in ledger.iter().filter(|txn| txn.occurred_at <= date) {
            matcher.apply(txn)?;
        }
        matcher.sell(quantity, price)?;

        let txn = self.new_transaction(scope, &asset, TradeSide::Sell, quantity, price, date);
        replay_with(ledger, &txn)?;

        self.storage
            .append_transaction(scope, &txn)
            .await
            .with_context(|| format!("Failed to record sell of {}", asset.symbol))?;

        info!(scope = %scope, symbol = %asset.symbol, %quantity, %price, %date, "recorded sell");
        Ok(txn)
    }

    /// Quantity of `symbol` held in `scope` at the end of `date`.
    pub async fn available_quantity(
        &self,
        scope: &LedgerScope,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Decimal> {
        let symbol = normalize_symbol(symbol);
        let txns = self.storage.get_transactions(scope, date).await?;
        let lots = match_lots(&symbol, txns.iter().filter(|txn| txn.symbol() == symbol))?;
        Ok(lots.remaining_quantity)
    }

    // Reporting

    /// Holdings and totals for `scope` from ledger entries on or before `cutoff`.
    pub async fn report(&self, scope: &LedgerScope, cutoff: NaiveDate) -> Result<PortfolioReport> {
        self.report_with_mode(scope, cutoff, self.totals_mode).await
    }

    pub async fn report_with_mode(
        &self,
        scope: &LedgerScope,
        cutoff: NaiveDate,
        mode: TotalsMode,
    ) -> Result<PortfolioReport> {
        self.ensure_scope(scope).await?;

        let txns = self.storage.get_transactions(scope, cutoff).await?;
        debug!(scope = %scope, %cutoff, entries = txns.len(), "replaying ledger");
        let matched = match_by_asset(&txns)?;

        let mut prices: HashMap<String, ResolvedPrice> = HashMap::new();
        for entry in matched.iter().filter(|m| m.lots.is_open()) {
            let symbol = &entry.asset.symbol;
            if let Some(point) = self.market_data.price_as_of(symbol, cutoff).await? {
                prices.insert(
                    symbol.clone(),
                    ResolvedPrice {
                        price: point.close,
                        as_of_date: point.as_of_date,
                    },
                );
            }
        }

        let summary = aggregate(
            matched,
            |symbol| prices.get(symbol).copied(),
            mode,
            cutoff,
        )?;

        Ok(PortfolioReport {
            scope: scope.clone(),
            as_of_date: cutoff,
            summary,
        })
    }

    // Portfolios

    pub async fn create_portfolio(&self, name: &str, description: &str) -> Result<Portfolio> {
        if let Some(problem) = portfolio_name_problem(name) {
            return Err(AccountingError::InvalidPortfolio(problem).into());
        }
        let portfolio =
            Portfolio::new_with_generator(self.ids.as_ref(), self.clock.as_ref(), name, description);
        self.storage.save_portfolio(&portfolio).await?;
        info!(portfolio_id = %portfolio.id, name = %portfolio.name, "created portfolio");
        Ok(portfolio)
    }

    /// Newest first.
    pub async fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        self.storage.list_portfolios().await
    }

    /// Look up by id, or by name when unambiguous.
    pub async fn get_portfolio(&self, id_or_name: &str) -> Result<Option<Portfolio>> {
        find_portfolio(self.storage.as_ref(), id_or_name).await
    }

    pub async fn update_portfolio(
        &self,
        id: &Id,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Portfolio> {
        let mut portfolio = self
            .storage
            .get_portfolio(id)
            .await?
            .ok_or_else(|| AccountingError::UnknownScope(LedgerScope::portfolio(id.clone())))?;

        if let Some(name) = name {
            if let Some(problem) = portfolio_name_problem(name) {
                return Err(AccountingError::InvalidPortfolio(problem).into());
            }
            portfolio.name = name.trim().to_string();
        }
        if let Some(description) = description {
            portfolio.description = description.to_string();
        }
        portfolio.updated_at = self.clock.now();

        self.storage.save_portfolio(&portfolio).await?;
        info!(portfolio_id = %portfolio.id, "updated portfolio");
        Ok(portfolio)
    }

    // Assets

    /// Register or overwrite an asset.
    pub async fn add_asset(
        &self,
        symbol: &str,
        name: &str,
        kind: AssetKind,
        exchange: Option<&str>,
    ) -> Result<Asset> {
        check_symbol(symbol)?;
        let mut asset = Asset::new(symbol, name, kind);
        if let Some(exchange) = exchange.filter(|e| !e.trim().is_empty()) {
            asset = asset.with_exchange(exchange.trim());
        }
        self.storage.save_asset(&asset).await?;
        info!(symbol = %asset.symbol, kind = ?asset.kind, "registered asset");
        Ok(asset)
    }

    /// Register an asset from the market-data source's profile.
    pub async fn sync_asset(&self, symbol: &str) -> Result<Asset> {
        check_symbol(symbol)?;
        if !self.market_data.has_source() {
            anyhow::bail!("No market data source configured; use `asset add` instead");
        }
        let profile = self
            .market_data
            .fetch_profile(symbol)
            .await
            .with_context(|| format!("Failed to fetch profile for {}", normalize_symbol(symbol)))?
            .ok_or_else(|| AccountingError::UnknownAsset(normalize_symbol(symbol)))?;
        let asset = profile.into_asset();
        self.storage.save_asset(&asset).await?;
        info!(symbol = %asset.symbol, name = %asset.name, "synced asset");
        Ok(asset)
    }

    /// Ordered by symbol.
    pub async fn list_assets(&self) -> Result<Vec<Asset>> {
        self.storage.list_assets().await
    }

    pub async fn get_asset(&self, symbol: &str) -> Result<Option<Asset>> {
        self.storage.get_asset(symbol).await
    }

    /// Remove an asset from the registry. Ledger entries are kept.
    pub async fn delete_asset(&self, symbol: &str) -> Result<bool> {
        let removed = self.storage.delete_asset(symbol).await?;
        if removed {
            info!(symbol = %normalize_symbol(symbol), "removed asset");
        }
        Ok(removed)
    }

    async fn registered_asset(&self, symbol: &str) -> Result<Asset> {
        let symbol = normalize_symbol(symbol);
        match self.storage.get_asset(&symbol).await? {
            Some(asset) => Ok(asset),
            None => Err(AccountingError::UnknownAsset(symbol).into()),
        }
    }

    async fn ensure_scope(&self, scope: &LedgerScope) -> Result<()> {
        if self.storage.scope_exists(scope).await? {
            Ok(())
        } else {
            Err(AccountingError::UnknownScope(scope.clone()).into())
        }
    }

    async fn check_replay(&self, scope: &LedgerScope, txn: &Transaction) -> Result<()> {
        let ledger = self.asset_ledger(scope, txn.symbol()).await?;
        replay_with(ledger, txn)?;
        Ok(())
    }

    /// Full ledger for one asset, in ledger order.
    async fn asset_ledger(&self, scope: &LedgerScope, symbol: &str) -> Result<Vec<Transaction>> {
        let mut txns: Vec<Transaction> = self
            .storage
            .get_ledger(scope)
            .await?
            .into_iter()
            .filter(|txn| txn.symbol() == symbol)
            .collect();
        sort_ledger(&mut txns);
        Ok(txns)
    }

    fn new_transaction(
        &self,
        scope: &LedgerScope,
        asset: &Asset,
        side: TradeSide,
        quantity: Decimal,
        price: Decimal,
        date: NaiveDate,
    ) -> Transaction {
        Transaction::new_with_generator(
            self.ids.as_ref(),
            self.clock.as_ref(),
            scope.clone(),
            asset,
            side,
            quantity,
            price,
            date,
        )
    }
}

/// Replay `ledger` with `txn` inserted at its date.
fn replay_with(mut ledger: Vec<Transaction>, txn: &Transaction) -> Result<(), AccountingError> {
    ledger.push(txn.clone());
    sort_ledger(&mut ledger);
    match_lots(txn.symbol(), &ledger)?;
    Ok(())
}

fn check_symbol(symbol: &str) -> Result<(), AccountingError> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() || !Id::is_path_safe(&symbol) {
        return Err(AccountingError::InvalidTransaction(format!(
            "invalid symbol {symbol:?}"
        )));
    }
    Ok(())
}

fn check_order(symbol: &str, quantity: Decimal, price: Decimal) -> Result<(), AccountingError> {
    check_symbol(symbol)?;
    if quantity <= Decimal::ZERO {
        return Err(AccountingError::InvalidTransaction(format!(
            "quantity must be greater than 0, got {quantity}"
        )));
    }
    if price <= Decimal::ZERO {
        return Err(AccountingError::InvalidTransaction(format!(
            "price must be greater than 0, got {price}"
        )));
    }
    Ok(())
}

