//! The swappable boundary between [`crate::Cloud`] and a concrete IaaS API.

use crate::error::CloudError;
use crate::instance::Instance;

/// Everything a single autoscale-group poll must report back in one shot.
#[derive(Debug, Clone, Default)]
pub struct CloudSnapshot {
    /// Every instance the autoscale group currently owns, valid or not.
    pub instances: Vec<Instance>,
    /// The autoscale group's current desired capacity.
    pub desired_capacity: u32,
}

/// The cloud-specific half of the Cloud Adapter contract (`spec.md` §6).
///
/// Implementations own the actual SDK/API calls; [`crate::Cloud`] owns
/// everything else (valid-instance bookkeeping, the stall state machine).
pub trait CloudBackend: Send {
    /// Poll the autoscale group for its instances and desired capacity.
    fn refresh(&mut self) -> Result<CloudSnapshot, CloudError>;

    /// Set the autoscale group's desired capacity.
    fn set_capacity(&mut self, new_capacity: u32) -> Result<(), CloudError>;

    /// Terminate the named instances outright.
    fn terminate_instances(&mut self, instance_ids: &[String]) -> Result<(), CloudError>;
}
