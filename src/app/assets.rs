use anyhow::Result;

use crate::models::{normalize_symbol, Asset, AssetKind};

use super::App;

fn asset_json(asset: &Asset) -> serde_json::Value {
    serde_json::json!({
        "symbol": asset.symbol,
        "name": asset.name,
        "kind": asset.kind,
        "exchange": asset.exchange,
    })
}

pub async fn add_asset(
    app: &App,
    symbol: &str,
    name: Option<&str>,
    kind: Option<&str>,
    exchange: Option<&str>,
) -> Result<serde_json::Value> {
    let kind = match kind {
        Some(value) => AssetKind::parse(value).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid asset kind: {value}. Use: stock, crypto, etf, mutual_fund, other"
            )
        })?,
        None => AssetKind::default(),
    };
    let asset = app
        .portfolio
        .add_asset(symbol, name.unwrap_or_default(), kind, exchange)
        .await?;
    Ok(serde_json::json!({
        "success": true,
        "asset": asset_json(&asset),
    }))
}

pub async fn sync_asset(app: &App, symbol: &str) -> Result<serde_json::Value> {
    let asset = app.portfolio.sync_asset(symbol).await?;
    Ok(serde_json::json!({
        "success": true,
        "asset": asset_json(&asset),
    }))
}

pub async fn list_assets(app: &App) -> Result<serde_json::Value> {
    let assets = app.portfolio.list_assets().await?;
    Ok(serde_json::Value::Array(assets.iter().map(asset_json).collect()))
}

pub async fn show_asset(app: &App, symbol: &str) -> Result<serde_json::Value> {
    match app.portfolio.get_asset(symbol).await? {
        Some(asset) => Ok(asset_json(&asset)),
        None => Ok(serde_json::json!({
            "success": false,
            "error": "Asset not found",
            "symbol": symbol,
        })),
    }
}

pub async fn remove_asset(app: &App, symbol: &str) -> Result<serde_json::Value> {
    let removed = app.portfolio.delete_asset(symbol).await?;
    Ok(serde_json::json!({
        "success": removed,
        "symbol": normalize_symbol(symbol),
    }))
}
