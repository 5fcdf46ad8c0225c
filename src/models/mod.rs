mod asset;
mod id;
mod id_generator;
mod portfolio;
mod scope;
mod transaction;

pub use asset::{normalize_symbol, Asset, AssetKind};
pub use id::{Id, IdError};
pub use id_generator::{IdGenerator, SequenceIdGenerator, UuidIdGenerator};
pub use portfolio::{portfolio_name_problem, Portfolio, MAX_PORTFOLIO_NAME_LEN};
pub use scope::LedgerScope;
pub use transaction::{sort_ledger, AssetRef, TradeSide, Transaction};
