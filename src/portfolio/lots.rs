//! FIFO lot matching.
//!
//! A ledger for one asset is replayed in order: buys open lots at the tail of
//! a queue, sells consume lots from the head. Nothing here touches storage or
//! prices, and lots never outlive the matcher that created them.

use std::collections::{BTreeMap, VecDeque};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{AssetRef, TradeSide, Transaction};

use super::AccountingError;

/// Unconsumed slice of a past buy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lot {
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

impl Lot {
    pub fn cost(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

/// Outcome of replaying one asset's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotMatch {
    pub symbol: String,
    pub open_lots: Vec<Lot>,
    pub realized_profit: Decimal,
    pub remaining_quantity: Decimal,
    pub remaining_cost: Decimal,
}

impl LotMatch {
    /// Remaining cost per remaining unit, or zero when nothing is held.
    pub fn average_cost(&self) -> Decimal {
        if self.remaining_quantity > Decimal::ZERO {
            self.remaining_cost / self.remaining_quantity
        } else {
            Decimal::ZERO
        }
    }

    pub fn is_open(&self) -> bool {
        self.remaining_quantity > Decimal::ZERO
    }
}

/// Incremental FIFO matcher for a single asset.
///
/// Used both to replay a stored ledger and to check a prospective sell
/// against it before anything is appended.
#[derive(Debug, Clone)]
pub struct LotMatcher {
    symbol: String,
    lots: VecDeque<Lot>,
    realized_profit: Decimal,
    remaining_quantity: Decimal,
    remaining_cost: Decimal,
}

impl LotMatcher {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            lots: VecDeque::new(),
            realized_profit: Decimal::ZERO,
            remaining_quantity: Decimal::ZERO,
            remaining_cost: Decimal::ZERO,
        }
    }

    /// Quantity currently held.
    pub fn available(&self) -> Decimal {
        self.remaining_quantity
    }

    pub fn realized_profit(&self) -> Decimal {
        self.realized_profit
    }

    pub fn apply(&mut self, txn: &Transaction) -> Result<(), AccountingError> {
        match txn.side {
            TradeSide::Buy => self.buy(txn.abs_quantity(), txn.unit_price),
            TradeSide::Sell => self.sell(txn.abs_quantity(), txn.unit_price),
        }
    }

    pub fn buy(&mut self, quantity: Decimal, price: Decimal) -> Result<(), AccountingError> {
        self.check_trade(quantity, price)?;
        let cost = quantity
            .checked_mul(price)
            .ok_or_else(|| self.overflow("buy cost"))?;
        let remaining_quantity = self
            .remaining_quantity
            .checked_add(quantity)
            .ok_or_else(|| self.overflow("held quantity"))?;
        let remaining_cost = self
            .remaining_cost
            .checked_add(cost)
            .ok_or_else(|| self.overflow("remaining cost"))?;

        self.lots.push_back(Lot {
            quantity,
            unit_cost: price,
        });
        self.remaining_quantity = remaining_quantity;
        self.remaining_cost = remaining_cost;
        Ok(())
    }

    /// Consume `quantity` units from the oldest lots at `price`.
    ///
    /// The consumption is computed before anything is changed, so on failure
    /// the matcher is left exactly as it was.
    pub fn sell(&mut self, quantity: Decimal, price: Decimal) -> Result<(), AccountingError> {
        self.check_trade(quantity, price)?;
        if quantity > self.remaining_quantity {
            return Err(self.insufficient(quantity));
        }

        let mut outstanding = quantity;
        let mut realized = self.realized_profit;
        let mut released_cost = Decimal::ZERO;
        let mut emptied = 0;
        let mut head_left = None;
        for lot in &self.lots {
            if outstanding <= Decimal::ZERO {
                break;
            }
            let taken = lot.quantity.min(outstanding);
            realized = taken
                .checked_mul(price - lot.unit_cost)
                .and_then(|gain| realized.checked_add(gain))
                .ok_or_else(|| self.overflow("realized profit"))?;
            released_cost = taken
                .checked_mul(lot.unit_cost)
                .and_then(|cost| released_cost.checked_add(cost))
                .ok_or_else(|| self.overflow("released cost"))?;
            outstanding -= taken;
            if taken == lot.quantity {
                emptied += 1;
            } else {
                head_left = Some(lot.quantity - taken);
            }
        }
        if outstanding > Decimal::ZERO {
            // Lot quantities no longer add up to the running total.
            return Err(self.insufficient(quantity));
        }

        self.lots.drain(..emptied);
        if let (Some(left), Some(head)) = (head_left, self.lots.front_mut()) {
            head.quantity = left;
        }
        self.realized_profit = realized;
        self.remaining_quantity -= quantity;
        self.remaining_cost -= released_cost;
        Ok(())
    }

    pub fn finish(self) -> LotMatch {
        LotMatch {
            symbol: self.symbol,
            open_lots: self.lots.into_iter().collect(),
            realized_profit: self.realized_profit,
            remaining_quantity: self.remaining_quantity,
            remaining_cost: self.remaining_cost,
        }
    }

    fn check_trade(&self, quantity: Decimal, price: Decimal) -> Result<(), AccountingError> {
        if quantity <= Decimal::ZERO {
            return Err(AccountingError::InvalidTransaction(format!(
                "{}: quantity must be greater than 0, got {quantity}",
                self.symbol
            )));
        }
        if price < Decimal::ZERO {
            return Err(AccountingError::InvalidTransaction(format!(
                "{}: price cannot be negative, got {price}",
                self.symbol
            )));
        }
        Ok(())
    }

    fn overflow(&self, what: &str) -> AccountingError {
        AccountingError::InvalidTransaction(format!(
            "{}: {what} exceeds the representable decimal range",
            self.symbol
        ))
    }

    fn insufficient(&self, requested: Decimal) -> AccountingError {
        AccountingError::InsufficientHoldings {
            symbol: self.symbol.clone(),
            requested,
            available: self.remaining_quantity,
        }
    }
}

/// Replay an already ordered ledger for one asset.
pub fn match_lots<'a>(
    symbol: &str,
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> Result<LotMatch, AccountingError> {
    let mut matcher = LotMatcher::new(symbol);
    for txn in transactions {
        matcher.apply(txn)?;
    }
    Ok(matcher.finish())
}

/// Matcher output for one asset, with the descriptive fields of its latest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedAsset {
    pub asset: AssetRef,
    pub lots: LotMatch,
}

/// Group an ordered mixed-asset ledger by symbol and replay each group.
///
/// Output is sorted by symbol.
pub fn match_by_asset(transactions: &[Transaction]) -> Result<Vec<MatchedAsset>, AccountingError> {
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for txn in transactions {
        groups.entry(txn.symbol()).or_default().push(txn);
    }

    let mut matched = Vec::with_capacity(groups.len());
    for (symbol, txns) in groups {
        let Some(latest) = txns.last() else {
            continue;
        };
        let asset = latest.asset.clone();
        let lots = match_lots(symbol, txns)?;
        matched.push(MatchedAsset { asset, lots });
    }
    Ok(matched)
}
