//! The reconciliation lock.
//!
//! Concurrent `apply` calls for the same (database, table) pair — several
//! process workers booting at once against a shared database is the usual
//! case — must not interleave their DDL. A process-global lease registry
//! serializes them: acquisition waits for the prior holder, and a lease
//! expires after [`LEASE_TTL`] so a holder that never released (crashed
//! mid-operation, leaked its guard) cannot deadlock the key forever.
//!
//! Callers for different keys proceed concurrently without contention.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// How long a lease is honored before another caller may claim the key.
pub const LEASE_TTL: Duration = Duration::from_secs(60);

/// How often a waiter re-checks for an expired lease.
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Identifies one reconciliation target.
///
/// The database component is absent when the connection cannot report a
/// current database; the key then degrades to the table name alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockKey {
    database: Option<String>,
    table: String,
}

impl LockKey {
    /// Creates a key for the given database/table pair.
    #[must_use]
    pub fn new(database: Option<String>, table: impl Into<String>) -> Self {
        Self {
            database,
            table: table.into(),
        }
    }
}

/// A keyed lease table: key → lease expiry.
#[derive(Debug, Default)]
pub struct LeaseRegistry {
    leases: Mutex<HashMap<LockKey, Instant>>,
    released: Notify,
}

impl LeaseRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lease for `key`, waiting for any prior holder.
    ///
    /// The lease is released when the returned guard drops — on every exit
    /// path, including failure.
    pub async fn acquire(&self, key: LockKey) -> LeaseGuard<'_> {
        loop {
            if self.try_claim(&key) {
                return LeaseGuard {
                    registry: self,
                    key,
                };
            }
            // Wake on release, or re-check after a short interval; lease
            // expiry is not signalled.
            tokio::select! {
                () = self.released.notified() => {}
                () = tokio::time::sleep(RETRY_INTERVAL) => {}
            }
        }
    }

    fn try_claim(&self, key: &LockKey) -> bool {
        let mut leases = self
            .leases
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        match leases.get(key) {
            Some(expiry) if *expiry > now => false,
            _ => {
                leases.insert(key.clone(), now + LEASE_TTL);
                true
            }
        }
    }

    fn release(&self, key: &LockKey) {
        let mut leases = self
            .leases
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        leases.remove(key);
        drop(leases);
        self.released.notify_waiters();
    }
}

/// Holds a claimed lease; dropping it releases the key.
#[must_use = "the lease is released as soon as the guard drops"]
#[derive(Debug)]
pub struct LeaseGuard<'a> {
    registry: &'a LeaseRegistry,
    key: LockKey,
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key);
    }
}

/// The process-global registry used by the reconciler.
pub fn registry() -> &'static LeaseRegistry {
    static REGISTRY: OnceLock<LeaseRegistry> = OnceLock::new();
    REGISTRY.get_or_init(LeaseRegistry::new)
}
