use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

use super::{Id, IdGenerator};

pub const MAX_PORTFOLIO_NAME_LEN: usize = 100;

/// A named portfolio. Its ledger lives under `LedgerScope::Portfolio(id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portfolio {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Portfolio {
    pub fn new_with_generator(
        ids: &dyn IdGenerator,
        clock: &dyn Clock,
        name: &str,
        description: &str,
    ) -> Self {
        let now = clock.now();
        Self {
            id: ids.new_id(),
            name: name.trim().to_string(),
            description: description.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Returns a human-readable reason when `name` is not an acceptable portfolio name.
pub fn portfolio_name_problem(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Some("Portfolio name cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_PORTFOLIO_NAME_LEN {
        return Some(format!(
            "Portfolio name cannot exceed {MAX_PORTFOLIO_NAME_LEN} characters"
        ));
    }
    None
}
