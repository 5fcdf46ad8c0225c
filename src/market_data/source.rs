use anyhow::Result;
use chrono::NaiveDate;

use super::{AssetProfile, PricePoint};

/// An external provider of daily bars and symbol profiles.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Daily bars with `start <= as_of_date <= end`, ascending. Unknown symbols yield an empty list.
    async fn fetch_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PricePoint>>;

    /// Name and classification for `symbol`, or `None` when the source does not know it.
    async fn fetch_profile(&self, symbol: &str) -> Result<Option<AssetProfile>>;

    fn name(&self) -> &str;
}
