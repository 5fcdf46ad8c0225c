use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{Id, IdError};

/// The grouping key a ledger is kept under.
///
/// `Global` is the implicit single portfolio keyed only by symbol;
/// `Portfolio` keys the ledger by a named portfolio. Matching and aggregation
/// never look at the scope, only the storage does.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum LedgerScope {
    Global,
    Portfolio(Id),
}

impl LedgerScope {
    pub fn portfolio(id: Id) -> Self {
        LedgerScope::Portfolio(id)
    }

    /// Build a scope from an optional portfolio id given on the command line.
    pub fn from_portfolio_arg(portfolio: Option<&str>) -> Result<Self, IdError> {
        match portfolio {
            Some(id) => Ok(LedgerScope::Portfolio(Id::from_string_checked(id)?)),
            None => Ok(LedgerScope::Global),
        }
    }

    pub fn portfolio_id(&self) -> Option<&Id> {
        match self {
            LedgerScope::Global => None,
            LedgerScope::Portfolio(id) => Some(id),
        }
    }

    /// Stable single-segment key, used for directory names.
    pub fn storage_key(&self) -> String {
        match self {
            LedgerScope::Global => "global".to_string(),
            LedgerScope::Portfolio(id) => format!("portfolio-{id}"),
        }
    }
}

impl fmt::Display for LedgerScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerScope::Global => f.write_str("global"),
            LedgerScope::Portfolio(id) => write!(f, "portfolio:{id}"),
        }
    }
}

impl FromStr for LedgerScope {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "global" => Ok(LedgerScope::Global),
            other => {
                let id = other.strip_prefix("portfolio:").unwrap_or(other);
                Ok(LedgerScope::Portfolio(Id::from_string_checked(id)?))
            }
        }
    }
}
