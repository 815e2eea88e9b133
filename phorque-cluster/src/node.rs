//! Scheduler-side node representation.

/// A worker node as reported by the batch scheduler.
///
/// The `state` string is opaque scheduler vocabulary (`free`, `idle`, `down`,
/// `offline`, `job-exclusive`, ...) and may contain several of these tokens at
/// once; callers match on substrings rather than parsing it into an enum,
/// mirroring how the scheduler itself reports compound states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Stable hostname the scheduler and the cloud both use to identify this worker.
    pub hostname: String,
    /// Declared processor count for this node.
    pub np: u32,
    /// Raw scheduler state string.
    pub state: String,
    /// Set once this node has been offlined by the policy engine, pending termination.
    pub terminate_me: bool,
}

impl Node {
    /// Construct a freshly observed node; `terminate_me` always starts false since
    /// that flag is only ever set by [`crate::Cluster::offline_node`].
    pub fn new(hostname: impl Into<String>, np: u32, state: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            np,
            state: state.into(),
            terminate_me: false,
        }
    }

    /// True iff this node's state matches the idle-or-down selection rule:
    /// one of `idle`/`down`/`offline`/`free`, and not `job-exclusive`.
    pub fn is_idle_or_down(&self) -> bool {
        let has_candidate_token = ["idle", "down", "offline", "free"]
            .iter()
            .any(|token| self.state.contains(token));
        has_candidate_token && !self.state.contains("job-exclusive")
    }

    /// True iff the scheduler did not report this node as `down`.
    pub fn is_up(&self) -> bool {
        !self.state.contains("down")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_node_matches() {
        let n = Node::new("host-a", 4, "free");
        assert!(n.is_idle_or_down());
    }

    #[test]
    fn job_exclusive_excludes_even_if_idle_token_present() {
        let n = Node::new("host-b", 4, "idle,job-exclusive");
        assert!(!n.is_idle_or_down());
    }

    #[test]
    fn down_node_matches() {
        let n = Node::new("host-c", 4, "down");
        assert!(n.is_idle_or_down());
        assert!(!n.is_up());
    }

    #[test]
    fn busy_node_does_not_match() {
        let n = Node::new("host-d", 4, "job-exclusive");
        assert!(!n.is_idle_or_down());
        assert!(n.is_up());
    }

    #[test]
    fn new_node_is_not_marked_for_termination() {
        let n = Node::new("host-e", 2, "free");
        assert!(!n.terminate_me);
    }
}
