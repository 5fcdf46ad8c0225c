use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use super::{MarketDataStore, PricePoint};
use crate::models::{normalize_symbol, Id};

/// Daily bars in one JSONL file per symbol and year: `prices/{SYMBOL}/{YYYY}.jsonl`.
///
/// Year files are rewritten whole on every put, sorted by date, one bar per date.
pub struct JsonlMarketDataStore {
    base_path: PathBuf,
}

impl JsonlMarketDataStore {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn prices_dir(&self, symbol: &str) -> Result<PathBuf> {
        let symbol = normalize_symbol(symbol);
        if !Id::is_path_safe(&symbol) {
            anyhow::bail!("Refusing to use symbol {symbol:?} as a path");
        }
        Ok(self.base_path.join("prices").join(symbol))
    }

    fn price_file(&self, symbol: &str, year: i32) -> Result<PathBuf> {
        Ok(self.prices_dir(symbol)?.join(format!("{year:04}.jsonl")))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_jsonl(&self, path: &Path) -> Result<Vec<PricePoint>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: PricePoint = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {line}"))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn write_jsonl(&self, path: &Path, items: &[PricePoint]) -> Result<()> {
        self.ensure_dir(path).await?;

        let mut content = String::new();
        for item in items {
            let line = serde_json::to_string(item).context("Failed to serialize item")?;
            content.push_str(&line);
            content.push('\n');
        }

        fs::write(path, content)
            .await
            .context("Failed to write JSONL file")?;
        Ok(())
    }

    /// Years that have a price file for `symbol`, ascending.
    async fn years(&self, symbol: &str) -> Result<Vec<i32>> {
        let dir = self.prices_dir(symbol)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read prices directory"),
        };

        let mut years = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            if let Some(year) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<i32>().ok())
            {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }

    /// Bars in a year file keyed by date; later lines win.
    async fn read_year(&self, symbol: &str, year: i32) -> Result<BTreeMap<NaiveDate, PricePoint>> {
        let path = self.price_file(symbol, year)?;
        Ok(self
            .read_jsonl(&path)
            .await?
            .into_iter()
            .map(|bar| (bar.as_of_date, bar))
            .collect())
    }
}

#[async_trait::async_trait]
impl MarketDataStore for JsonlMarketDataStore {
    async fn get_price_on_or_before(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Option<PricePoint>> {
        if !Id::is_path_safe(&normalize_symbol(symbol)) {
            return Ok(None);
        }
        for year in self.years(symbol).await?.into_iter().rev() {
            if year > date.year() {
                continue;
            }
            let bars = self.read_year(symbol, year).await?;
            if let Some((_, bar)) = bars.range(..=date).next_back() {
                return Ok(Some(bar.clone()));
            }
        }
        Ok(None)
    }

    async fn get_prices_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>> {
        if start > end || !Id::is_path_safe(&normalize_symbol(symbol)) {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for year in self.years(symbol).await? {
            if year < start.year() || year > end.year() {
                continue;
            }
            let bars = self.read_year(symbol, year).await?;
            out.extend(bars.range(start..=end).map(|(_, bar)| bar.clone()));
        }
        Ok(out)
    }

    async fn put_prices(&self, prices: &[PricePoint]) -> Result<()> {
        if prices.is_empty() {
            return Ok(());
        }

        let mut grouped: HashMap<(String, i32), Vec<PricePoint>> = HashMap::new();
        for price in prices {
            let key = (normalize_symbol(&price.symbol), price.as_of_date.year());
            grouped.entry(key).or_default().push(price.clone());
        }

        for ((symbol, year), items) in grouped {
            let mut bars = self.read_year(&symbol, year).await?;
            let added = items.len();
            for item in items {
                bars.insert(item.as_of_date, item);
            }
            let path = self.price_file(&symbol, year)?;
            let all: Vec<PricePoint> = bars.into_values().collect();
            self.write_jsonl(&path, &all).await?;
            debug!(symbol = %symbol, year, added, total = all.len(), "stored prices");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn bar(date: &str, close: &str) -> PricePoint {
        PricePoint::close_only(
            "AAPL",
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            close.parse::<Decimal>().unwrap(),
            "test",
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn put_prices_rewrites_year_file_in_chronological_order() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonlMarketDataStore::new(dir.path());

        store.put_prices(&[bar("2024-12-31", "250.00")]).await?;
        store.put_prices(&[bar("2024-01-15", "180.00")]).await?;

        let content = fs::read_to_string(dir.path().join("prices/AAPL/2024.jsonl")).await?;
        let parsed: Vec<PricePoint> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].close, "180.00".parse::<Decimal>().unwrap());
        assert_eq!(parsed[1].close, "250.00".parse::<Decimal>().unwrap());
        Ok(())
    }

    #[tokio::test]
    async fn on_or_before_crosses_year_boundary() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonlMarketDataStore::new(dir.path());
        store
            .put_prices(&[bar("2023-12-29", "190.00"), bar("2024-01-03", "184.25")])
            .await?;

        let jan_2 = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let hit = store.get_price_on_or_before("AAPL", jan_2).await?.unwrap();
        assert_eq!(hit.as_of_date, NaiveDate::from_ymd_opt(2023, 12, 29).unwrap());

        let range = store
            .get_prices_between(
                "aapl",
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            )
            .await?;
        assert_eq!(range.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn same_date_is_replaced_not_duplicated() -> Result<()> {
        let dir = TempDir::new()?;
        let store = JsonlMarketDataStore::new(dir.path());
        store.put_prices(&[bar("2024-02-01", "100")]).await?;
        store.put_prices(&[bar("2024-02-01", "101")]).await?;

        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let all = store.get_prices_between("AAPL", date, date).await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].close, Decimal::from(101));
        Ok(())
    }
}
