use anyhow::Result;

use crate::models::{Id, LedgerScope, Portfolio};
use crate::portfolio::AccountingError;

use super::App;

fn portfolio_json(portfolio: &Portfolio) -> serde_json::Value {
    serde_json::json!({
        "id": portfolio.id.to_string(),
        "name": portfolio.name,
        "description": portfolio.description,
        "created_at": portfolio.created_at,
        "updated_at": portfolio.updated_at,
    })
}

pub async fn create_portfolio(app: &App, name: &str, description: &str) -> Result<serde_json::Value> {
    let portfolio = app.portfolio.create_portfolio(name, description).await?;
    Ok(serde_json::json!({
        "success": true,
        "portfolio": portfolio_json(&portfolio),
    }))
}

pub async fn list_portfolios(app: &App) -> Result<serde_json::Value> {
    let portfolios = app.portfolio.list_portfolios().await?;
    Ok(serde_json::Value::Array(
        portfolios.iter().map(portfolio_json).collect(),
    ))
}

/// Portfolio metadata plus its holdings as of today.
pub async fn show_portfolio(app: &App, id_or_name: &str) -> Result<serde_json::Value> {
    match app.portfolio.get_portfolio(id_or_name).await? {
        Some(portfolio) => {
            let scope = LedgerScope::portfolio(portfolio.id.clone());
            let report = app.portfolio.report(&scope, app.clock.today()).await?;
            let mut output = portfolio_json(&portfolio);
            output["holdings"] = serde_json::to_value(report.render(&app.config.display))?;
            Ok(output)
        }
        None => Ok(serde_json::json!({
            "success": false,
            "error": "Portfolio not found",
            "id": id_or_name,
        })),
    }
}

pub async fn update_portfolio(
    app: &App,
    id_or_name: &str,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<serde_json::Value> {
    let id = match app.portfolio.get_portfolio(id_or_name).await? {
        Some(found) => found.id,
        None => {
            let id = Id::from_string_checked(id_or_name)?;
            return Err(AccountingError::UnknownScope(LedgerScope::portfolio(id)).into());
        }
    };
    let portfolio = app.portfolio.update_portfolio(&id, name, description).await?;
    Ok(serde_json::json!({
        "success": true,
        "portfolio": portfolio_json(&portfolio),
    }))
}
