use chrono::NaiveDate;
use serde::Serialize;

use crate::config::DisplayConfig;
use crate::format::{format_fixed, format_percent, round_fixed};
use crate::models::LedgerScope;

use super::{Holding, HoldingsSummary, PriceFallback};

/// Holdings of one scope as of a cutoff date, in full precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioReport {
    pub scope: LedgerScope,
    pub as_of_date: NaiveDate,
    pub summary: HoldingsSummary,
}

impl PortfolioReport {
    pub fn render(&self, display: &DisplayConfig) -> ReportOutput {
        ReportOutput::from_report(self, display)
    }
}

/// Display form of one holding. Numbers are fixed-point strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingOutput {
    pub symbol: String,
    pub name: String,
    pub quantity: String,
    pub average_cost: String,
    pub latest_price: String,
    pub market_value: String,
    pub unrealized_profit: String,
    pub realized_profit: String,
    pub profit_rate: String,
    pub weight_percentage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_fallback: Option<PriceFallback>,
}

impl HoldingOutput {
    fn from_holding(holding: &Holding, display: &DisplayConfig) -> Self {
        let money = |value| format_fixed(value, display.money_decimals);
        Self {
            symbol: holding.symbol.clone(),
            name: holding.name.clone(),
            quantity: format_fixed(holding.quantity, display.quantity_decimals),
            average_cost: money(holding.average_cost),
            latest_price: money(holding.latest_price),
            market_value: money(holding.market_value),
            unrealized_profit: money(holding.unrealized_profit),
            realized_profit: money(holding.realized_profit),
            profit_rate: format_percent(holding.profit_rate, display.rate_decimals),
            weight_percentage: format_percent(holding.weight, display.rate_decimals),
            price_date: holding.price_date,
            price_fallback: holding.price_fallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutput {
    pub scope: String,
    pub as_of_date: NaiveDate,
    pub holdings: Vec<HoldingOutput>,
    pub total_market_value: String,
    pub total_realized_profit: String,
    pub total_asset: String,
    pub warnings: Vec<String>,
}

impl ReportOutput {
    pub fn from_report(report: &PortfolioReport, display: &DisplayConfig) -> Self {
        let summary = &report.summary;
        let total = |value| format_fixed(value, display.total_decimals);
        // Total asset is the sum of the two rendered totals, so the printed
        // figures always add up.
        let market_value = round_fixed(summary.total_market_value, display.total_decimals);
        let realized_profit = round_fixed(summary.total_realized_profit, display.total_decimals);
        let total_asset = market_value
            .checked_add(realized_profit)
            .unwrap_or(summary.total_asset);
        Self {
            scope: report.scope.to_string(),
            as_of_date: report.as_of_date,
            holdings: summary
                .holdings
                .iter()
                .map(|h| HoldingOutput::from_holding(h, display))
                .collect(),
            total_market_value: total(market_value),
            total_realized_profit: total(realized_profit),
            total_asset: total(total_asset),
            warnings: summary.warnings.iter().map(|w| w.message.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetKind;
    use rust_decimal::Decimal;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn renders_fixed_precision_and_camel_case_keys() {
        let holding = Holding {
            symbol: "AAPL".to_string(),
            name: "Apple Inc.".to_string(),
            kind: AssetKind::Stock,
            quantity: dec("10.5"),
            average_cost: dec("185"),
            remaining_cost: dec("1942.5"),
            latest_price: dec("192.01"),
            price_date: NaiveDate::from_ymd_opt(2024, 6, 28),
            price_fallback: None,
            market_value: dec("2016.105"),
            unrealized_profit: dec("73.605"),
            realized_profit: Decimal::ZERO,
            profit_rate: dec("73.605") / dec("1942.5"),
            weight: Decimal::ONE,
            open_lots: Vec::new(),
        };
        let report = PortfolioReport {
            scope: LedgerScope::Global,
            as_of_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            summary: HoldingsSummary {
                holdings: vec![holding],
                total_market_value: dec("2016.105"),
                total_realized_profit: Decimal::ZERO,
                total_asset: dec("2016.105"),
                warnings: Vec::new(),
            },
        };

        let output = report.render(&DisplayConfig::default());
        let json = serde_json::to_value(&output).unwrap();
        let row = &json["holdings"][0];
        assert_eq!(row["quantity"], "10.5000");
        assert_eq!(row["averageCost"], "185.0000");
        assert_eq!(row["marketValue"], "2016.1050");
        assert_eq!(row["profitRate"], "3.79");
        assert_eq!(row["weightPercentage"], "100.00");
        assert_eq!(row["priceDate"], "2024-06-28");
        assert!(row.get("priceFallback").is_none());
        assert_eq!(json["totalMarketValue"], "2016.11");
        assert_eq!(json["totalAsset"], "2016.11");
        assert_eq!(json["scope"], "global");
        assert_eq!(json["asOfDate"], "2024-06-30");
    }

    #[test]
    fn rendered_totals_add_up() {
        let report = PortfolioReport {
            scope: LedgerScope::Global,
            as_of_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            summary: HoldingsSummary {
                holdings: Vec::new(),
                total_market_value: dec("1.006"),
                total_realized_profit: dec("0.006"),
                total_asset: dec("1.012"),
                warnings: Vec::new(),
            },
        };

        let output = report.render(&DisplayConfig::default());
        assert_eq!(output.total_market_value, "1.01");
        assert_eq!(output.total_realized_profit, "0.01");
        assert_eq!(output.total_asset, "1.02");
    }
}
