//! Named locks serializing mutations of one remote object

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lock keyed by string, e.g. a VPC ID while subnets inside it change
#[derive(Debug, Clone, Default)]
pub struct MutexKv {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl MutexKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock named `key`. It is released when the guard drops.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = self.entry(key);
        tracing::debug!("locking {:?}", key);
        let guard = entry.lock_owned().await;
        tracing::debug!("locked {:?}", key);
        guard
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // entries only the map still references have no holder or waiter
        locks.retain(|name, lock| name == key || Arc::strong_count(lock) > 1);
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}
