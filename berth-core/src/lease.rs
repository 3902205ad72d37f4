//! Per-stack-name leases.
//!
//! Two deploys (or a deploy and a remove) of the same stack name must not
//! interleave their platform calls. A lease is an async mutex keyed by stack
//! name, held for the whole operation and released on drop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Registry of per-stack-name locks.
#[derive(Default)]
pub struct StackLeases {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Proof that the holder has exclusive use of a stack name.
pub struct StackLease {
    name: String,
    _guard: OwnedMutexGuard<()>,
}

impl StackLease {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl StackLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lease on `name`.
    pub async fn acquire(&self, name: &str) -> StackLease {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries nobody else references are dead weight.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(name.to_string()).or_default().clone()
        };

        debug!(stack = %name, "Waiting for stack lease");
        let guard = lock.lock_owned().await;
        debug!(stack = %name, "Stack lease acquired");

        StackLease { name: name.to_string(), _guard: guard }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_is_exclusive() {
        let leases = StackLeases::new();
        let first = leases.acquire("myapp").await;
        assert_eq!(first.name(), "myapp");
        let blocked =
            tokio::time::timeout(Duration::from_millis(20), leases.acquire("myapp")).await;
        assert!(blocked.is_err());

        drop(first);
        let free = tokio::time::timeout(Duration::from_secs(1), leases.acquire("myapp")).await;
        assert!(free.is_ok());
    }

    #[tokio::test]
    async fn test_different_names_do_not_block() {
        let leases = StackLeases::new();
        let _a = leases.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_secs(1), leases.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let leases = Arc::new(StackLeases::new());
        let held = leases.acquire("myapp").await;

        let waiter = {
            let leases = leases.clone();
            tokio::spawn(async move { leases.acquire("myapp").await.name().to_string() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert_eq!(waiter.await.unwrap(), "myapp");
    }
}
