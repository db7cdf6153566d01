//! Coordination-free sequence (nonce) allocation.
//!
//! Every client instance derives its next sequence from its static `Topology`, the
//! account nonce observed once at startup and a private round counter. Two instances
//! never exchange anything, yet their outputs stay disjoint as long as the topology
//! passes `Topology::validate`.

use crate::types::Topology;


/// Computes the sequence for `round` without touching any counter.
///
/// `base + (worker_index + round * worker_count) * per_worker_capacity + vm_index + offset`
///
/// Arithmetic wraps instead of panicking. If `engine_capacity` is not a multiple of
/// `worker_count` the truncated per-worker slice makes neighbouring slices overlap
/// and distinct instances can collide; the ledger then rejects the duplicate.
pub fn compute_sequence(topology: &Topology, base_nonce: u64, round: u64, offset: u64) -> u64 {
    let per_worker = topology.per_worker_capacity();
    let slot = topology
        .worker_index
        .wrapping_add(round.wrapping_mul(topology.worker_count));
    base_nonce
        .wrapping_add(slot.wrapping_mul(per_worker))
        .wrapping_add(topology.vm_index)
        .wrapping_add(offset)
}

/// Per-instance allocator. Owned by exactly one `ClientInstance`, never shared.
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    topology: Topology,
    base_nonce: u64,
    round: u64,
}

impl SequenceAllocator {
    pub fn new(topology: Topology, base_nonce: u64) -> Self {
        Self {
            topology,
            base_nonce,
            round: 0,
        }
    }

    /// Returns the next sequence and advances the round by exactly one.
    ///
    /// `offset` is the adapter-declared constant added on top of the slot
    /// (for example `+1` to keep invocations clear of the deploy nonce).
    pub fn next_sequence(&mut self, offset: u64) -> u64 {
        let sequence = compute_sequence(&self.topology, self.base_nonce, self.round, offset);
        self.round = self.round.wrapping_add(1);
        sequence
    }

    /// The sequence the next call would return, without advancing.
    pub fn peek(&self, offset: u64) -> u64 {
        compute_sequence(&self.topology, self.base_nonce, self.round, offset)
    }

    /// Number of sequences handed out so far.
    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn base_nonce(&self) -> u64 {
        self.base_nonce
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}
