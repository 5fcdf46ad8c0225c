use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Fraction digits used when rendering report values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Held quantities.
    pub quantity_decimals: u32,

    /// Per-holding prices, costs, values and profits.
    pub money_decimals: u32,

    /// Portfolio totals.
    pub total_decimals: u32,

    /// Profit rate and weight, rendered as percentages.
    pub rate_decimals: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            quantity_decimals: 4,
            money_decimals: 4,
            total_decimals: 2,
            rate_decimals: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSourceKind {
    /// Only prices already in the local store are used.
    #[default]
    None,
    /// Yahoo Finance chart API.
    Yahoo,
}

fn default_lookback_days() -> u32 {
    7
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Market-data settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub source: PriceSourceKind,

    /// Days before the cutoff to request when a price has to be fetched.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Override for the source's API base URL.
    pub base_url: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            source: PriceSourceKind::None,
            lookback_days: default_lookback_days(),
            base_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Application configuration as written in `holdbook.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    pub display: DisplayConfig,

    pub market_data: MarketDataConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: PathBuf,
    pub display: DisplayConfig,
    pub market_data: MarketDataConfig,
}

/// Returns the default config file path.
///
/// `./holdbook.toml` when present, else `holdbook/holdbook.toml` under the
/// platform data directory.
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("holdbook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("holdbook").join("holdbook.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_dir))
    }

    /// Load config, falling back to defaults rooted at the config's intended directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        Ok(Self::from_config(Config::default(), config_dir))
    }

    fn from_config(config: Config, config_dir: &Path) -> Self {
        Self {
            data_dir: config.resolve_data_dir(config_dir),
            display: config.display,
            market_data: config.market_data,
        }
    }
}
