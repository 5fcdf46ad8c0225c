use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::PricePoint;

/// Large US stocks screened when no symbols are given.
pub const DEFAULT_MOVER_SYMBOLS: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "TSLA", "NVDA", "META", "NFLX", "AMD", "IBM", "COST", "WMT",
    "JPM", "BAC", "XOM", "CVX", "UNH", "LLY", "ABT", "HD", "INTC", "DIS", "T", "PFE", "GE", "F",
    "GM", "MCD", "KO", "HPQ",
];

pub const DEFAULT_MOVER_COUNT: usize = 5;

/// Intraday change of one symbol's bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Mover {
    pub symbol: String,
    pub as_of_date: NaiveDate,
    pub open: Decimal,
    pub close: Decimal,
    /// `(close - open) / open * 100`, rounded to 2 dp.
    pub growth_rate: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMovers {
    /// Highest growth first.
    pub top_gainers: Vec<Mover>,
    /// Lowest growth first.
    pub top_losers: Vec<Mover>,
}

/// Rank bars by intraday growth and take the top and bottom `n`.
///
/// Bars without a positive open are skipped. With fewer than `2n` usable bars
/// the two lists overlap.
pub fn rank_movers(bars: &[PricePoint], n: usize) -> MarketMovers {
    let mut movers: Vec<Mover> = bars
        .iter()
        .filter_map(|bar| {
            let open = bar.open.filter(|open| open.is_sign_positive() && !open.is_zero())?;
            let rate = (bar.close - open) / open * Decimal::ONE_HUNDRED;
            Some(Mover {
                symbol: bar.symbol.clone(),
                as_of_date: bar.as_of_date,
                open,
                close: bar.close,
                growth_rate: rate.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
            })
        })
        .collect();

    movers.sort_by(|a, b| {
        b.growth_rate
            .cmp(&a.growth_rate)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let top_gainers = movers.iter().take(n).cloned().collect();
    let top_losers = movers.iter().rev().take(n).cloned().collect();

    MarketMovers {
        top_gainers,
        top_losers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bar(symbol: &str, open: Option<i64>, close: i64) -> PricePoint {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let point = PricePoint::close_only(symbol, date, Decimal::from(close), "test", Utc::now());
        match open {
            Some(open) => point.with_open(Decimal::from(open)),
            None => point,
        }
    }

    #[test]
    fn ranks_gainers_and_losers() {
        let bars = vec![
            bar("AAA", Some(100), 110),
            bar("BBB", Some(100), 95),
            bar("CCC", Some(200), 201),
            bar("DDD", Some(50), 40),
            bar("EEE", None, 10),
            bar("FFF", Some(0), 10),
        ];

        let movers = rank_movers(&bars, 2);
        let gainers: Vec<&str> = movers.top_gainers.iter().map(|m| m.symbol.as_str()).collect();
        let losers: Vec<&str> = movers.top_losers.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(gainers, vec!["AAA", "CCC"]);
        assert_eq!(losers, vec!["DDD", "BBB"]);
        assert_eq!(movers.top_gainers[0].growth_rate, Decimal::from(10));
        assert_eq!(movers.top_losers[0].growth_rate, Decimal::from(-20));
    }

    #[test]
    fn growth_rate_rounds_to_two_places() {
        let movers = rank_movers(&[bar("AAA", Some(3), 4)], 5);
        assert_eq!(movers.top_gainers[0].growth_rate, "33.33".parse::<Decimal>().unwrap());
        assert_eq!(movers.top_losers.len(), 1);
    }
}
