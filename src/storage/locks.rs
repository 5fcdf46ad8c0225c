use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::LedgerScope;

/// Exclusive hold on one scope's ledger, released on drop.
///
/// Taken around read, validate and append so two writers cannot both
/// validate against the same balance.
pub struct LedgerLock {
    _held: Box<dyn Send + Sync>,
}

impl LedgerLock {
    pub fn new<T: Send + Sync + 'static>(held: T) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl std::fmt::Debug for LedgerLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LedgerLock")
    }
}

/// One async mutex per ledger scope, for writers within one process.
#[derive(Debug, Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<LedgerScope, Arc<AsyncMutex<()>>>>,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, scope: &LedgerScope) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(scope.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
