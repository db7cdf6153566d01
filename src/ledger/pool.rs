use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Connections shared between the VMs of one worker.
///
/// VMs are grouped into buckets of `vms_per_connection` consecutive indices and every
/// bucket dials its connection once, on first use. Concurrent first callers of the
/// same bucket wait for a single dial. `C` is a cheap handle (usually an `Arc`).
pub struct ConnectionPool<C> {
    vms_per_connection: u64,
    buckets: Mutex<HashMap<u64, Arc<OnceCell<C>>>>,
}

impl<C: Clone> ConnectionPool<C> {
    /// `vms_per_connection` of 0 is treated as 1.
    pub fn new(vms_per_connection: u64) -> Self {
        Self {
            vms_per_connection: vms_per_connection.max(1),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn vms_per_connection(&self) -> u64 {
        self.vms_per_connection
    }

    /// Bucket serving `vm_index`
    pub fn bucket_of(&self, vm_index: u64) -> u64 {
        vm_index / self.vms_per_connection
    }

    /// Returns the connection of `vm_index`'s bucket, dialing it with `connect` if
    /// the bucket has none yet. A failed dial leaves the bucket empty for the next caller.
    pub async fn get_or_connect<F, Fut, E>(&self, vm_index: u64, connect: F) -> Result<C, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C, E>>,
    {
        let bucket = self.bucket_of(vm_index);
        let cell = {
            let mut buckets = self.buckets.lock().await;
            Arc::clone(buckets.entry(bucket).or_insert_with(|| Arc::new(OnceCell::new())))
        };
        let connection = cell
            .get_or_try_init(|| async move {
                tracing::debug!("Opening connection for bucket {}", bucket);
                connect().await
            })
            .await?;
        Ok(connection.clone())
    }

    /// Number of connections dialed so far
    pub async fn connection_count(&self) -> usize {
        let buckets = self.buckets.lock().await;
        buckets.values().filter(|cell| cell.initialized()).count()
    }
}
