mod jsonl_store;
mod models;
pub mod movers;
#[cfg(feature = "market_data")]
pub mod providers;
mod service;
mod source;
mod store;

pub use jsonl_store::JsonlMarketDataStore;
pub use models::{AssetProfile, PricePoint};
pub use movers::{rank_movers, MarketMovers, Mover};
pub use service::{MarketDataService, MANUAL_SOURCE};
pub use source::MarketDataSource;
pub use store::{MarketDataStore, MemoryMarketDataStore};
