use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Worker count must be positive")]
    ZeroWorkers,
    #[error("Engine capacity must be positive")]
    ZeroCapacity,
    #[error("Worker index {index} out of range for {count} workers")]
    WorkerIndexOutOfRange { index: u64, count: u64 },
    #[error("Engine capacity {capacity} is not a multiple of worker count {workers}")]
    UnevenCapacity { capacity: u64, workers: u64 },
    #[error("VM index {vm_index} exceeds the per-worker capacity {per_worker}")]
    VmIndexOutOfRange { vm_index: u64, per_worker: u64 },
}

/// Static placement of one client instance inside a benchmark run.
///
/// Fixed for the whole life of the instance. `engine_capacity` is the pending-sequence
/// budget of the entire run; every worker derives its slice from it without talking
/// to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topology {
    /// Number of worker processes taking part in the run
    pub worker_count: u64,
    /// Index of the worker hosting this instance, in `[0, worker_count)`
    pub worker_index: u64,
    /// Index of the VM inside its worker
    pub vm_index: u64,
    /// Total sequence budget reserved for the run
    pub engine_capacity: u64,
}

impl Topology {
    pub fn new(worker_count: u64, worker_index: u64, vm_index: u64, engine_capacity: u64) -> Self {
        Self {
            worker_count,
            worker_index,
            vm_index,
            engine_capacity,
        }
    }

    /// Sequence slots owned by each worker per round (integer division).
    pub fn per_worker_capacity(&self) -> u64 {
        if self.worker_count == 0 {
            return 0;
        }
        self.engine_capacity / self.worker_count
    }

    /// Rejects placements under which two instances could be handed the same sequence.
    ///
    /// Nothing checks this at allocation time, so it has to run when the run is configured.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.worker_count == 0 {
            return Err(TopologyError::ZeroWorkers);
        }
        if self.engine_capacity == 0 {
            return Err(TopologyError::ZeroCapacity);
        }
        if self.worker_index >= self.worker_count {
            return Err(TopologyError::WorkerIndexOutOfRange {
                index: self.worker_index,
                count: self.worker_count,
            });
        }
        if self.engine_capacity % self.worker_count != 0 {
            return Err(TopologyError::UnevenCapacity {
                capacity: self.engine_capacity,
                workers: self.worker_count,
            });
        }
        let per_worker = self.per_worker_capacity();
        if self.vm_index >= per_worker {
            return Err(TopologyError::VmIndexOutOfRange {
                vm_index: self.vm_index,
                per_worker,
            });
        }
        Ok(())
    }
}
