use anyhow::Result;
use chrono::Duration;

use crate::format::format_plain;
use crate::market_data::movers::{DEFAULT_MOVER_COUNT, DEFAULT_MOVER_SYMBOLS};
use crate::market_data::PricePoint;
use crate::models::normalize_symbol;

use super::{parse_date, parse_decimal, App};

const DEFAULT_HISTORY_DAYS: i64 = 30;

fn price_json(price: &PricePoint) -> serde_json::Value {
    serde_json::json!({
        "symbol": price.symbol,
        "date": price.as_of_date,
        "open": price.open.map(format_plain),
        "high": price.high.map(format_plain),
        "low": price.low.map(format_plain),
        "close": format_plain(price.close),
        "volume": price.volume,
        "source": price.source,
    })
}

pub async fn set_price(
    app: &App,
    symbol: &str,
    date: Option<&str>,
    price: &str,
) -> Result<serde_json::Value> {
    let date = app.date_or_today(date)?;
    let close = parse_decimal(price, "price")?;
    let point = app.market_data.record_price(symbol, date, close).await?;
    Ok(serde_json::json!({
        "success": true,
        "price": price_json(&point),
    }))
}

pub async fn sync_prices(
    app: &App,
    symbol: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<serde_json::Value> {
    let end = app.date_or_today(end)?;
    let start = match start {
        Some(value) => parse_date(value)?,
        None => end - Duration::days(DEFAULT_HISTORY_DAYS),
    };
    if start > end {
        anyhow::bail!("Start date {start} is after end date {end}");
    }

    let stored = app.market_data.sync_history(symbol, start, end).await?;
    Ok(serde_json::json!({
        "success": true,
        "symbol": normalize_symbol(symbol),
        "start": start,
        "end": end,
        "stored": stored,
    }))
}

pub async fn price_history(
    app: &App,
    symbol: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<serde_json::Value> {
    let end = app.date_or_today(end)?;
    let start = match start {
        Some(value) => parse_date(value)?,
        None => end - Duration::days(DEFAULT_HISTORY_DAYS),
    };

    let prices = app.market_data.history(symbol, start, end).await?;
    Ok(serde_json::json!({
        "symbol": normalize_symbol(symbol),
        "start": start,
        "end": end,
        "prices": prices.iter().map(price_json).collect::<Vec<_>>(),
    }))
}

pub async fn market_movers(
    app: &App,
    symbols: &[String],
    date: Option<&str>,
    top: Option<usize>,
) -> Result<serde_json::Value> {
    let date = app.date_or_today(date)?;
    let symbols: Vec<String> = if symbols.is_empty() {
        DEFAULT_MOVER_SYMBOLS.iter().map(|s| s.to_string()).collect()
    } else {
        symbols.iter().map(|s| normalize_symbol(s)).collect()
    };
    let n = top.unwrap_or(DEFAULT_MOVER_COUNT);

    let movers = app.market_data.movers(&symbols, date, n).await?;
    Ok(serde_json::json!({
        "date": date,
        "screened": symbols.len(),
        "topGainers": movers.top_gainers,
        "topLosers": movers.top_losers,
    }))
}
