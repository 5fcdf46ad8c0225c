use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use super::{LedgerLock, ScopeLocks, Storage};
use crate::models::{normalize_symbol, Asset, Id, LedgerScope, Portfolio, Transaction};

const LOCK_FILE: &str = ".lock";

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   portfolios/
///     {id}/
///       portfolio.json
///   assets/
///     {SYMBOL}/
///       asset.json
///   ledgers/
///     global/
///       transactions.jsonl
///       .lock
///     portfolio-{id}/
///       transactions.jsonl
///       .lock
/// ```
///
/// `.lock` carries an advisory exclusive lock while a writer holds the
/// ledger, so separate processes sharing a data directory are serialized.
pub struct JsonFileStorage {
    base_path: PathBuf,
    writers: ScopeLocks,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            writers: ScopeLocks::new(),
        }
    }

    fn portfolios_dir(&self) -> PathBuf {
        self.base_path.join("portfolios")
    }

    fn assets_dir(&self) -> PathBuf {
        self.base_path.join("assets")
    }

    fn portfolio_file(&self, id: &Id) -> Result<PathBuf> {
        if !Id::is_path_safe(id.as_str()) {
            anyhow::bail!("Refusing to use portfolio id {id:?} as a path");
        }
        Ok(self.portfolios_dir().join(id.as_str()).join("portfolio.json"))
    }

    fn asset_file(&self, symbol: &str) -> Result<PathBuf> {
        let symbol = normalize_symbol(symbol);
        if !Id::is_path_safe(&symbol) {
            anyhow::bail!("Refusing to use symbol {symbol:?} as a path");
        }
        Ok(self.assets_dir().join(symbol).join("asset.json"))
    }

    fn ledger_file(&self, scope: &LedgerScope) -> Result<PathBuf> {
        Ok(self.ledger_dir(scope)?.join("transactions.jsonl"))
    }

    fn ledger_dir(&self, scope: &LedgerScope) -> Result<PathBuf> {
        if let Some(id) = scope.portfolio_id() {
            if !Id::is_path_safe(id.as_str()) {
                anyhow::bail!("Refusing to use portfolio id {id:?} as a path");
            }
        }
        Ok(self.base_path.join("ledgers").join(scope.storage_key()))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {:?}", path)),
        }
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    async fn read_jsonl<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Vec<T>> {
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
            let item: T = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse ledger line in {:?}: {}", path, line))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_jsonl<T: serde::Serialize>(&self, path: &Path, item: &T) -> Result<()> {
        self.ensure_dir(path).await?;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open file for append")?;

        let mut line = serde_json::to_string(item).context("Failed to serialize item")?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    async fn list_dirs(&self, path: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();

        let mut entries = match fs::read_dir(path).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e).context("Failed to read directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            if let Ok(file_type) = entry.file_type().await {
                if file_type.is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        if !name.is_empty() {
                            names.push(name.to_string());
                        }
                    }
                }
            }
        }

        Ok(names)
    }
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        let mut portfolios = Vec::new();
        for name in self.list_dirs(&self.portfolios_dir()).await? {
            if let Some(portfolio) = self.get_portfolio(&Id::from_string(name)).await? {
                portfolios.push(portfolio);
            }
        }
        portfolios.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(portfolios)
    }

    async fn get_portfolio(&self, id: &Id) -> Result<Option<Portfolio>> {
        if !Id::is_path_safe(id.as_str()) {
            return Ok(None);
        }
        self.read_json(&self.portfolio_file(id)?).await
    }

    async fn save_portfolio(&self, portfolio: &Portfolio) -> Result<()> {
        let path = self.portfolio_file(&portfolio.id)?;
        self.write_json(&path, portfolio).await?;
        debug!(portfolio_id = %portfolio.id, "saved portfolio");
        Ok(())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        let mut assets = Vec::new();
        for name in self.list_dirs(&self.assets_dir()).await? {
            if let Some(asset) = self.get_asset(&name).await? {
                assets.push(asset);
            }
        }
        assets.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(assets)
    }

    async fn get_asset(&self, symbol: &str) -> Result<Option<Asset>> {
        if !Id::is_path_safe(&normalize_symbol(symbol)) {
            return Ok(None);
        }
        self.read_json(&self.asset_file(symbol)?).await
    }

    async fn save_asset(&self, asset: &Asset) -> Result<()> {
        let path = self.asset_file(&asset.symbol)?;
        self.write_json(&path, asset).await?;
        debug!(symbol = %asset.symbol, "saved asset");
        Ok(())
    }

    async fn delete_asset(&self, symbol: &str) -> Result<bool> {
        if !Id::is_path_safe(&normalize_symbol(symbol)) {
            return Ok(false);
        }
        let path = self.asset_file(symbol)?;
        let Some(dir) = path.parent() else {
            return Ok(false);
        };
        match fs::remove_dir_all(dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", dir)),
        }
    }

    async fn get_ledger(&self, scope: &LedgerScope) -> Result<Vec<Transaction>> {
        self.read_jsonl(&self.ledger_file(scope)?).await
    }

    async fn append_transaction(&self, scope: &LedgerScope, txn: &Transaction) -> Result<()> {
        let path = self.ledger_file(scope)?;
        self.append_jsonl(&path, txn).await?;
        debug!(scope = %scope, transaction_id = %txn.id, "appended ledger entry");
        Ok(())
    }

    async fn lock_ledger(&self, scope: &LedgerScope) -> Result<LedgerLock> {
        let dir = self.ledger_dir(scope)?;
        let in_process = self.writers.lock(scope).await;

        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create ledger directory {:?}", dir))?;
        let path = dir.join(LOCK_FILE);
        let file = tokio::task::spawn_blocking(move || -> Result<std::fs::File> {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)
                .with_context(|| format!("Failed to open ledger lock {:?}", path))?;
            file.lock()
                .with_context(|| format!("Failed to lock ledger {:?}", path))?;
            Ok(file)
        })
        .await
        .context("Ledger lock task failed")??;

        debug!(scope = %scope, "locked ledger");
        // Field order releases the file lock before the in-process mutex.
        Ok(LedgerLock::new((file, in_process)))
    }
}
