//! Cloud-side instance representation.

use chrono::{DateTime, Utc};

/// The run states a cloud may report that Phorque considers usable capacity.
pub const VALID_RUN_STATES: &[&str] = &["running", "pending"];

/// A single cloud instance as reported by an autoscale group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub hostname: String,
    pub run_state: String,
    pub launch_time: DateTime<Utc>,
}

impl Instance {
    pub fn new(
        id: impl Into<String>,
        hostname: impl Into<String>,
        run_state: impl Into<String>,
        launch_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            hostname: hostname.into(),
            run_state: run_state.into(),
            launch_time,
        }
    }

    /// True iff this instance's run state counts toward valid capacity.
    pub fn is_valid(&self) -> bool {
        VALID_RUN_STATES.contains(&self.run_state.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_and_pending_are_valid() {
        let now = Utc::now();
        assert!(Instance::new("i-1", "h1", "running", now).is_valid());
        assert!(Instance::new("i-2", "h2", "pending", now).is_valid());
    }

    #[test]
    fn terminated_is_not_valid() {
        let now = Utc::now();
        assert!(!Instance::new("i-3", "h3", "terminated", now).is_valid());
    }
}
