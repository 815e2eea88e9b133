//! The swappable boundary between [`crate::Cluster`] and a concrete batch scheduler.

use crate::error::ClusterError;
use crate::node::Node;

/// Everything a single scheduler poll must report back, consistently, in one shot.
///
/// `Cluster::update` trusts that a backend either returns a fully-populated
/// `ClusterUpdate` or an error — never a partially-updated view — so that a
/// failed poll leaves the previous tick's counters authoritative.
#[derive(Debug, Clone, Default)]
pub struct ClusterUpdate {
    /// Jobs currently sitting in the queue.
    pub num_queued_jobs: u32,
    /// Cores requested by queued jobs.
    pub num_queued_cores: u32,
    /// Total jobs known to the scheduler (queued + running).
    pub num_total_jobs: u32,
    /// Every node the scheduler currently knows about.
    pub nodes: Vec<Node>,
}

/// The scheduler-specific half of the Cluster Adapter contract (`spec.md` §6).
///
/// Implementations own the actual CLI invocations / API calls; `Cluster` owns
/// everything else (counters, `has_booted`, idempotency bookkeeping).
pub trait ClusterBackend: Send {
    /// Poll the scheduler for queue stats and the current node list.
    fn update(&mut self) -> Result<ClusterUpdate, ClusterError>;

    /// Register a new worker with the scheduler.
    fn add_node(&mut self, hostname: &str, np: u32) -> Result<(), ClusterError>;

    /// Deregister a worker from the scheduler.
    fn remove_node(&mut self, hostname: &str) -> Result<(), ClusterError>;

    /// Stop placing new work on a worker.
    fn offline_node(&mut self, hostname: &str) -> Result<(), ClusterError>;
}
