//! The baseline policy: react to nothing, scale nothing. Useful for running
//! Phorque purely as a scheduler/cloud bridge without autoscaling.

use phorque_cloud::CloudRegistry;
use phorque_cluster::Cluster;

use crate::engine::Policy;
use crate::error::PolicyError;

#[derive(Debug, Default)]
pub struct OnDemand;

impl OnDemand {
    pub fn new() -> Self {
        Self
    }
}

impl Policy for OnDemand {
    fn execute(&mut self, _cluster: &mut Cluster, _registry: &mut CloudRegistry) -> Result<(), PolicyError> {
        Ok(())
    }
}
