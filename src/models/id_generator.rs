use std::collections::VecDeque;
use std::sync::Mutex;

use super::Id;

/// Source of ids for new portfolios and ledger entries, swappable in tests.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> Id;
}

#[derive(Debug, Clone, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn new_id(&self) -> Id {
        Id::new()
    }
}

/// Hands out a pre-seeded sequence of ids, then numbered fallbacks.
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    ids: Mutex<VecDeque<Id>>,
    issued: Mutex<u64>,
}

impl SequenceIdGenerator {
    pub fn new(ids: impl IntoIterator<Item = Id>) -> Self {
        Self {
            ids: Mutex::new(ids.into_iter().collect()),
            issued: Mutex::new(0),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn new_id(&self) -> Id {
        let mut issued = self.issued.lock().expect("id counter lock poisoned");
        *issued += 1;
        self.ids
            .lock()
            .expect("id sequence lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Id::from_string(format!("id-{issued}")))
    }
}
