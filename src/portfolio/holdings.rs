//! Turns matched lots plus a price snapshot into holdings and portfolio totals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::AssetKind;

use super::{AccountingError, Lot, MatchedAsset};

/// Price used to value a holding, with the date it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub price: Decimal,
    pub as_of_date: NaiveDate,
}

/// How a holding was valued when no market price was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceFallback {
    /// Valued at its own average cost.
    AverageCost,
    /// No price and no usable cost; valued at zero.
    Unavailable,
}

/// Which realized profits count toward the portfolio total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsMode {
    /// Every asset in the ledger, including fully sold ones.
    #[default]
    AllAssets,
    /// Only assets still held at the cutoff.
    HeldOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub kind: AssetKind,
    pub quantity: Decimal,
    pub average_cost: Decimal,
    pub remaining_cost: Decimal,
    pub latest_price: Decimal,
    pub price_date: Option<NaiveDate>,
    pub price_fallback: Option<PriceFallback>,
    pub market_value: Decimal,
    pub unrealized_profit: Decimal,
    pub realized_profit: Decimal,
    /// Unrealized profit over remaining cost, as a fraction.
    pub profit_rate: Decimal,
    /// Share of total market value, as a fraction.
    pub weight: Decimal,
    pub open_lots: Vec<Lot>,
}

/// A degraded valuation the caller should surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceWarning {
    pub symbol: String,
    pub fallback: PriceFallback,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingsSummary {
    pub holdings: Vec<Holding>,
    pub total_market_value: Decimal,
    pub total_realized_profit: Decimal,
    pub total_asset: Decimal,
    pub warnings: Vec<PriceWarning>,
}

/// Value every open position and compute portfolio totals.
///
/// `price_lookup` returns the price as of `cutoff` for a symbol, if known.
/// Missing prices never fail the aggregation; they degrade the affected
/// holding and add a warning. A value outside the decimal range is an
/// `InvalidTransaction` error.
pub fn aggregate<F>(
    matched: Vec<MatchedAsset>,
    mut price_lookup: F,
    mode: TotalsMode,
    cutoff: NaiveDate,
) -> Result<HoldingsSummary, AccountingError>
where
    F: FnMut(&str) -> Option<ResolvedPrice>,
{
    let mut holdings = Vec::new();
    let mut warnings = Vec::new();
    let mut total_market_value = Decimal::ZERO;
    let mut total_realized_profit = Decimal::ZERO;

    for MatchedAsset { asset, lots } in matched {
        if !lots.is_open() {
            if mode == TotalsMode::AllAssets {
                total_realized_profit = total_realized_profit
                    .checked_add(lots.realized_profit)
                    .ok_or_else(|| overflow(&asset.symbol, "total realized profit"))?;
            }
            continue;
        }

        let average_cost = lots.average_cost();
        let (latest_price, price_date, price_fallback) = match price_lookup(&asset.symbol) {
            Some(resolved) => (resolved.price, Some(resolved.as_of_date), None),
            None if average_cost > Decimal::ZERO => {
                warn!(symbol = %asset.symbol, %cutoff, "no price found, valuing at average cost");
                warnings.push(PriceWarning {
                    symbol: asset.symbol.clone(),
                    fallback: PriceFallback::AverageCost,
                    message: format!(
                        "No price data for {} on or before {cutoff}; valued at average cost",
                        asset.symbol
                    ),
                });
                (average_cost, None, Some(PriceFallback::AverageCost))
            }
            None => {
                let missing = AccountingError::MissingPriceData {
                    symbol: asset.symbol.clone(),
                    cutoff,
                };
                warn!(symbol = %asset.symbol, %cutoff, "no price and no cost basis, valuing at zero");
                warnings.push(PriceWarning {
                    symbol: asset.symbol.clone(),
                    fallback: PriceFallback::Unavailable,
                    message: missing.to_string(),
                });
                (Decimal::ZERO, None, Some(PriceFallback::Unavailable))
            }
        };

        let market_value = lots
            .remaining_quantity
            .checked_mul(latest_price)
            .ok_or_else(|| overflow(&asset.symbol, "market value"))?;
        let unrealized_profit = market_value - lots.remaining_cost;
        let profit_rate = if lots.remaining_cost > Decimal::ZERO {
            unrealized_profit
                .checked_div(lots.remaining_cost)
                .ok_or_else(|| overflow(&asset.symbol, "profit rate"))?
        } else {
            Decimal::ZERO
        };

        total_market_value = total_market_value
            .checked_add(market_value)
            .ok_or_else(|| overflow(&asset.symbol, "total market value"))?;
        total_realized_profit = total_realized_profit
            .checked_add(lots.realized_profit)
            .ok_or_else(|| overflow(&asset.symbol, "total realized profit"))?;

        holdings.push(Holding {
            symbol: asset.symbol,
            name: asset.name,
            kind: asset.kind,
            quantity: lots.remaining_quantity,
            average_cost,
            remaining_cost: lots.remaining_cost,
            latest_price,
            price_date,
            price_fallback,
            market_value,
            unrealized_profit,
            realized_profit: lots.realized_profit,
            profit_rate,
            weight: Decimal::ZERO,
            open_lots: lots.open_lots,
        });
    }

    if total_market_value != Decimal::ZERO {
        for holding in &mut holdings {
            holding.weight = holding.market_value / total_market_value;
        }
    }

    let total_asset = total_market_value
        .checked_add(total_realized_profit)
        .ok_or_else(|| overflow("portfolio", "total asset"))?;

    Ok(HoldingsSummary {
        holdings,
        total_market_value,
        total_realized_profit,
        total_asset,
        warnings,
    })
}

fn overflow(symbol: &str, what: &str) -> AccountingError {
    AccountingError::InvalidTransaction(format!(
        "{symbol}: {what} exceeds the representable decimal range"
    ))
}
