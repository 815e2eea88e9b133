//! The Cluster Adapter (component A): the abstract, scheduler-independent view
//! of queue depth and node health that the rest of the engine operates on.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::backend::ClusterBackend;
use crate::error::ClusterError;
use crate::node::Node;

/// The scheduler-independent view of the cluster: queue counters, the current
/// node list, and the set of hostnames ever seen in a non-`down` state.
///
/// `Cluster` owns its node list and counters exclusively (`spec.md` §3); the
/// policy engine only ever reaches them through the methods below.
pub struct Cluster {
    backend: Box<dyn ClusterBackend>,

    pub nodes: Vec<Node>,

    pub num_queued_jobs: u32,
    pub num_queued_cores: u32,
    pub num_total_jobs: u32,
    pub num_total_nodes: u32,
    pub num_total_cores: u32,
    pub num_free_cores: u32,
    pub num_down_cores: u32,

    /// Hostnames ever observed in a non-`down` state since process start.
    has_booted: HashSet<String>,

    /// Hostnames currently known to the scheduler, used only to make
    /// `add_node`/`remove_node` idempotent between ticks.
    known_hostnames: HashSet<String>,
}

impl Cluster {
    /// Wrap a concrete scheduler backend in a fresh, empty snapshot.
    pub fn new(backend: Box<dyn ClusterBackend>) -> Self {
        Self {
            backend,
            nodes: Vec::new(),
            num_queued_jobs: 0,
            num_queued_cores: 0,
            num_total_jobs: 0,
            num_total_nodes: 0,
            num_total_cores: 0,
            num_free_cores: 0,
            num_down_cores: 0,
            has_booted: HashSet::new(),
            known_hostnames: HashSet::new(),
        }
    }

    /// Refresh queue stats, the node list, and every derived counter from the
    /// scheduler. On failure, all prior state is left untouched and the error
    /// is returned to the caller (the control loop logs it and moves on).
    pub fn update(&mut self) -> Result<(), ClusterError> {
        debug!("polling scheduler for cluster state");
        let snapshot = self.backend.update()?;

        let mut total_nodes = 0u32;
        let mut total_cores = 0u32;
        let mut free_cores = 0u32;
        let mut down_cores = 0u32;
        for n in &snapshot.nodes {
            total_nodes += 1;
            total_cores += n.np;
            if n.state.contains("free") {
                free_cores += n.np;
            }
            if n.state.contains("down") {
                down_cores += n.np;
            }
            if n.is_up() {
                self.has_booted.insert(n.hostname.clone());
            }
        }

        self.known_hostnames = snapshot.nodes.iter().map(|n| n.hostname.clone()).collect();
        self.nodes = snapshot.nodes;
        self.num_queued_jobs = snapshot.num_queued_jobs;
        self.num_queued_cores = snapshot.num_queued_cores;
        self.num_total_jobs = snapshot.num_total_jobs;
        self.num_total_nodes = total_nodes;
        self.num_total_cores = total_cores;
        self.num_free_cores = free_cores;
        self.num_down_cores = down_cores;

        debug!(
            total_nodes,
            total_cores, free_cores, down_cores, "cluster state updated"
        );
        Ok(())
    }

    /// Register a worker with the scheduler. No-op if already present.
    pub fn add_node(&mut self, hostname: &str, np: u32) {
        if self.known_hostnames.contains(hostname) {
            debug!(hostname, "node already registered, skipping add");
            return;
        }
        match self.backend.add_node(hostname, np) {
            Ok(()) => {
                self.known_hostnames.insert(hostname.to_string());
            }
            Err(e) => error!(hostname, error = %e, "failed to add node"),
        }
    }

    /// Deregister a worker from the scheduler. No-op if absent.
    pub fn remove_node(&mut self, hostname: &str) {
        if !self.known_hostnames.contains(hostname) {
            debug!(hostname, "node not present, skipping remove");
            return;
        }
        match self.backend.remove_node(hostname) {
            Ok(()) => {
                self.known_hostnames.remove(hostname);
                self.has_booted.remove(hostname);
                self.nodes.retain(|n| n.hostname != hostname);
            }
            Err(e) => error!(hostname, error = %e, "failed to remove node"),
        }
    }

    /// Instruct the scheduler to stop placing work on this node and mark it
    /// `terminate_me` so the policy engine's drain phase can find it again.
    pub fn offline_node(&mut self, hostname: &str) {
        match self.backend.offline_node(hostname) {
            Ok(()) => {
                if let Some(node) = self.nodes.iter_mut().find(|n| n.hostname == hostname) {
                    node.terminate_me = true;
                }
            }
            Err(e) => error!(hostname, error = %e, "failed to offline node"),
        }
    }

    /// Hostnames that are idle or down (and not job-exclusive). When
    /// `require_booted` is set, a hostname must also have been observed at
    /// least once in a non-`down` state, preventing termination of an
    /// instance the scheduler has never confirmed as alive.
    pub fn idle_or_down_hostnames(&self, require_booted: bool) -> Vec<String> {
        let names: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| n.is_idle_or_down())
            .filter(|n| !require_booted || self.has_booted.contains(&n.hostname))
            .map(|n| n.hostname.clone())
            .collect();
        debug!(?names, require_booted, "idle-or-down hostnames");
        names
    }

    /// Hostnames marked `terminate_me` by a prior `offline_node` call.
    pub fn hostnames_to_terminate(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|n| n.terminate_me)
            .map(|n| n.hostname.clone())
            .collect()
    }

    /// True iff this hostname has ever been observed in a non-`down` state.
    pub fn has_booted(&self, hostname: &str) -> bool {
        self.has_booted.contains(hostname)
    }
}
