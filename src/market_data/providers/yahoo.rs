//! Yahoo Finance chart API source.
//!
//! Uses the unauthenticated v8 chart endpoint for both daily bars and the
//! symbol profile carried in the chart `meta` block.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use crate::config::MarketDataConfig;
use crate::market_data::{AssetProfile, MarketDataSource, PricePoint};
use crate::models::{normalize_symbol, AssetKind};

const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
const SOURCE_NAME: &str = "yahoo";
const PRICE_DECIMALS: u32 = 6;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    instrument_type: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    exchange_name: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance daily bars and profiles.
#[derive(Debug, Clone)]
pub struct YahooChartSource {
    client: Client,
    base_url: String,
}

impl YahooChartSource {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: YAHOO_BASE_URL.to_string(),
        }
    }

    /// Build from config: request timeout, user agent and optional base URL override.
    pub fn from_config(config: &MarketDataConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("holdbook/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        let source = Self::with_client(client);
        Ok(match &config.base_url {
            Some(url) => source.with_base_url(url),
            None => source,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `None` when Yahoo does not know the symbol.
    async fn fetch_chart(&self, symbol: &str, query: &[(&str, String)]) -> Result<Option<ChartResult>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!(symbol, url = %url, "requesting yahoo chart");

        let response = self.client.get(&url).query(query).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .with_context(|| format!("Yahoo chart request failed for {symbol}"))?;

        let body: ChartResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Yahoo chart response for {symbol}"))?;

        if let Some(error) = body.chart.error {
            if error.code.eq_ignore_ascii_case("not found") {
                return Ok(None);
            }
            return Err(anyhow!("Yahoo chart error for {symbol}: {}", error.description));
        }

        Ok(body.chart.result.and_then(|results| results.into_iter().next()))
    }

    fn profile_from_meta(meta: &ChartMeta) -> AssetProfile {
        let name = meta
            .long_name
            .clone()
            .or_else(|| meta.short_name.clone())
            .unwrap_or_else(|| meta.symbol.clone());
        let kind = meta
            .instrument_type
            .as_deref()
            .map(AssetKind::from_instrument_type)
            .unwrap_or_default();
        AssetProfile {
            symbol: normalize_symbol(&meta.symbol),
            name,
            kind,
            exchange: meta.exchange_name.clone(),
        }
    }

    fn to_decimal(value: Option<f64>) -> Option<Decimal> {
        value
            .and_then(Decimal::from_f64)
            .map(|d| d.round_dp(PRICE_DECIMALS))
    }

    fn bars_from_chart(chart: ChartResult, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
        let symbol = normalize_symbol(&chart.meta.symbol);
        let offset = chart.meta.gmtoffset;
        let series = chart
            .indicators
            .and_then(|i| i.quote.into_iter().next())
            .unwrap_or_default();
        let at = |values: &Vec<Option<f64>>, i: usize| values.get(i).copied().flatten();

        let mut bars = Vec::new();
        for (i, ts) in chart.timestamp.iter().enumerate() {
            let Some(close) = Self::to_decimal(at(&series.close, i)) else {
                continue;
            };
            let Some(timestamp) = DateTime::<Utc>::from_timestamp(*ts, 0) else {
                continue;
            };
            let Some(local) = DateTime::<Utc>::from_timestamp(ts + offset, 0) else {
                continue;
            };
            let as_of_date = local.date_naive();
            if as_of_date < start || as_of_date > end {
                continue;
            }
            bars.push(PricePoint {
                symbol: symbol.clone(),
                as_of_date,
                timestamp,
                open: Self::to_decimal(at(&series.open, i)),
                high: Self::to_decimal(at(&series.high, i)),
                low: Self::to_decimal(at(&series.low, i)),
                close,
                volume: series.volume.get(i).copied().flatten(),
                source: SOURCE_NAME.to_string(),
            });
        }
        bars.sort_by_key(|bar| bar.as_of_date);
        bars.dedup_by_key(|bar| bar.as_of_date);
        bars
    }
}

impl Default for YahooChartSource {
    fn default() -> Self {
        Self::new()
    }
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[async_trait::async_trait]
impl MarketDataSource for YahooChartSource {
    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        if start > end {
            return Ok(Vec::new());
        }
        let symbol = normalize_symbol(symbol);
        let period2 = end
            .succ_opt()
            .map(epoch_seconds)
            .unwrap_or_else(|| epoch_seconds(end));
        let query = [
            ("period1", epoch_seconds(start).to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
        ];

        match self.fetch_chart(&symbol, &query).await? {
            Some(chart) => Ok(Self::bars_from_chart(chart, start, end)),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_profile(&self, symbol: &str) -> Result<Option<AssetProfile>> {
        let symbol = normalize_symbol(symbol);
        let query = [("range", "1d".to_string()), ("interval", "1d".to_string())];
        Ok(self
            .fetch_chart(&symbol, &query)
            .await?
            .map(|chart| Self::profile_from_meta(&chart.meta)))
    }

    fn name(&self) -> &str {
        SOURCE_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_dates_use_exchange_offset() {
        // 2024-01-02 14:30 UTC is 09:30 in New York, same calendar day.
        let chart: ChartResult = serde_json::from_str(
            r#"{
                "meta": {"symbol": "AAPL", "gmtoffset": -18000},
                "timestamp": [1704205800],
                "indicators": {"quote": [{
                    "open": [187.15], "high": [188.44], "low": [183.89],
                    "close": [185.64], "volume": [82488700]
                }]}
            }"#,
        )
        .unwrap();

        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let bars = YahooChartSource::bars_from_chart(chart, day, day);
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].as_of_date, day);
        assert_eq!(bars[0].close, "185.64".parse::<Decimal>().unwrap());
        assert_eq!(bars[0].volume, Some(82_488_700));
    }

    #[test]
    fn null_closes_are_skipped() {
        let chart: ChartResult = serde_json::from_str(
            r#"{
                "meta": {"symbol": "AAPL"},
                "timestamp": [1704153600, 1704240000],
                "indicators": {"quote": [{"close": [null, 184.25]}]}
            }"#,
        )
        .unwrap();

        let bars = YahooChartSource::bars_from_chart(
            chart,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].as_of_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn profile_falls_back_to_short_name() {
        let meta: ChartMeta = serde_json::from_str(
            r#"{"symbol": "btc-usd", "instrumentType": "CRYPTOCURRENCY",
                "shortName": "Bitcoin USD", "exchangeName": "CCC"}"#,
        )
        .unwrap();
        let profile = YahooChartSource::profile_from_meta(&meta);
        assert_eq!(profile.symbol, "BTC-USD");
        assert_eq!(profile.name, "Bitcoin USD");
        assert_eq!(profile.kind, AssetKind::Crypto);
        assert_eq!(profile.exchange.as_deref(), Some("CCC"));
    }
}
