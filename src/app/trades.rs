use anyhow::Result;

use crate::format::format_plain;
use crate::models::{TradeSide, Transaction};
use crate::portfolio::TotalsMode;

use super::{parse_decimal, App};

/// A buy or sell as given on the command line.
#[derive(Debug, Clone)]
pub struct TradeRequest<'a> {
    pub side: TradeSide,
    pub symbol: &'a str,
    pub quantity: &'a str,
    pub price: &'a str,
    pub date: Option<&'a str>,
    pub portfolio: Option<&'a str>,
}

fn transaction_json(txn: &Transaction) -> serde_json::Value {
    serde_json::json!({
        "id": txn.id.to_string(),
        "scope": txn.scope.to_string(),
        "symbol": txn.asset.symbol,
        "name": txn.asset.name,
        "side": txn.side,
        "quantity": format_plain(txn.abs_quantity()),
        "price": format_plain(txn.unit_price),
        "date": txn.occurred_at,
    })
}

pub async fn record_trade(app: &App, request: TradeRequest<'_>) -> Result<serde_json::Value> {
    let quantity = parse_decimal(request.quantity, "quantity")?;
    let price = parse_decimal(request.price, "price")?;
    let date = app.date_or_today(request.date)?;
    let scope = app.resolve_scope(request.portfolio).await?;

    let txn = match request.side {
        TradeSide::Buy => {
            app.portfolio
                .record_buy(&scope, request.symbol, quantity, price, date)
                .await?
        }
        TradeSide::Sell => {
            app.portfolio
                .record_sell(&scope, request.symbol, quantity, price, date)
                .await?
        }
    };

    Ok(serde_json::json!({
        "success": true,
        "transaction": transaction_json(&txn),
    }))
}

pub async fn holdings(
    app: &App,
    portfolio: Option<&str>,
    as_of: Option<&str>,
    held_only: bool,
) -> Result<serde_json::Value> {
    let scope = app.resolve_scope(portfolio).await?;
    let cutoff = app.date_or_today(as_of)?;
    let mode = if held_only {
        TotalsMode::HeldOnly
    } else {
        TotalsMode::AllAssets
    };

    let report = app.portfolio.report_with_mode(&scope, cutoff, mode).await?;
    Ok(serde_json::to_value(report.render(&app.config.display))?)
}
