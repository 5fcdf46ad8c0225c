use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};

use super::{Asset, AssetKind, Id, IdGenerator, LedgerScope, UuidIdGenerator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// The asset fields copied onto each ledger entry at record time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub kind: AssetKind,
}

impl From<&Asset> for AssetRef {
    fn from(asset: &Asset) -> Self {
        Self {
            symbol: asset.symbol.clone(),
            name: asset.name.clone(),
            kind: asset.kind,
        }
    }
}

/// A single ledger entry. Stored in append-only JSONL files, never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Id,
    pub scope: LedgerScope,
    pub asset: AssetRef,
    pub side: TradeSide,
    /// Signed quantity: positive for buys, negative for sells.
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Trade date. Ledger order is by this date, then by append order.
    pub occurred_at: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        scope: LedgerScope,
        asset: &Asset,
        side: TradeSide,
        quantity: Decimal,
        unit_price: Decimal,
        occurred_at: NaiveDate,
    ) -> Self {
        Self::new_with_generator(
            &UuidIdGenerator,
            &SystemClock,
            scope,
            asset,
            side,
            quantity,
            unit_price,
            occurred_at,
        )
    }

    /// `quantity` is the unsigned trade size; the sign is applied from `side`.
    #[allow(clippy::too_many_arguments)]
    pub fn new_with_generator(
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
        scope: LedgerScope,
        asset: &Asset,
        side: TradeSide,
        quantity: Decimal,
        unit_price: Decimal,
        occurred_at: NaiveDate,
    ) -> Self {
        let magnitude = quantity.abs();
        let quantity = match side {
            TradeSide::Buy => magnitude,
            TradeSide::Sell => -magnitude,
        };
        Self {
            id: ids.new_id(),
            scope,
            asset: AssetRef::from(asset),
            side,
            quantity,
            unit_price,
            occurred_at,
            recorded_at: clock.now(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.asset.symbol
    }

    /// Trade size without sign.
    pub fn abs_quantity(&self) -> Decimal {
        self.quantity.abs()
    }
}

/// Stable sort by trade date; entries on the same date keep append order.
pub fn sort_ledger(transactions: &mut [Transaction]) {
    transactions.sort_by_key(|txn| txn.occurred_at);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::models::SequenceIdGenerator;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sell_quantity_is_stored_negative() {
        let ids = SequenceIdGenerator::new([Id::from("tx-1")]);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap());
        let asset = Asset::new("AAPL", "Apple Inc.", AssetKind::Stock);

        let txn = Transaction::new_with_generator(
            &ids,
            &clock,
            LedgerScope::Global,
            &asset,
            TradeSide::Sell,
            Decimal::new(5, 0),
            Decimal::new(150, 0),
            date(2024, 3, 1),
        );

        assert_eq!(txn.id.as_str(), "tx-1");
        assert_eq!(txn.quantity, Decimal::new(-5, 0));
        assert_eq!(txn.abs_quantity(), Decimal::new(5, 0));
        assert_eq!(txn.recorded_at, clock.now());
    }

    #[test]
    fn sort_ledger_keeps_append_order_for_same_day() {
        let asset = Asset::new("BTC", "Bitcoin", AssetKind::Crypto);
        let make = |qty: i64, day: u32| {
            Transaction::new(
                LedgerScope::Global,
                &asset,
                TradeSide::Buy,
                Decimal::new(qty, 0),
                Decimal::ONE,
                date(2024, 1, day),
            )
        };
        let mut ledger = vec![make(1, 5), make(2, 3), make(3, 5), make(4, 3)];
        sort_ledger(&mut ledger);

        let quantities: Vec<Decimal> = ledger.iter().map(|t| t.quantity).collect();
        assert_eq!(
            quantities,
            vec![
                Decimal::from(2),
                Decimal::from(4),
                Decimal::from(1),
                Decimal::from(3)
            ]
        );
    }
}
