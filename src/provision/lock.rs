//! Per-tenant mutual exclusion
//!
//! Runs for the same tenant are serialized; runs for different tenants
//! proceed independently.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::context::Tenant;

/// Keyed async lock, one mutex per tenant
#[derive(Default)]
pub struct TenantLocks {
    locks: DashMap<Tenant, Arc<Mutex<()>>>,
}

impl TenantLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other run holds the tenant, then hold it
    ///
    /// The tenant stays locked until the returned guard is dropped.
    pub async fn acquire(&self, tenant: &Tenant) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await
        let lock = self
            .locks
            .entry(tenant.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop table entries no run is holding or waiting on
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of tenants with a table entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
