//! The core autoscaling policy: launch instances to cover queued job cores,
//! or drain idle ones before their next billing boundary.

use tracing::debug;

use phorque_cloud::CloudRegistry;
use phorque_cluster::Cluster;

use crate::engine::{self, Policy};
use crate::error::PolicyError;

/// Scales the cluster to keep queued job cores covered, preferring the
/// cheapest cloud, and drains idle/down nodes before they roll into another
/// billing cycle.
pub struct OnDemandPlusPlus {
    multiplier: u32,
    loop_sleep_secs: i64,
}

impl OnDemandPlusPlus {
    pub fn new(multiplier: u32, loop_sleep_secs: i64) -> Self {
        Self {
            multiplier,
            loop_sleep_secs,
        }
    }
}

impl Policy for OnDemandPlusPlus {
    fn execute(&mut self, cluster: &mut Cluster, registry: &mut CloudRegistry) -> Result<(), PolicyError> {
        let num_valid_cloud_cores = registry.total_valid_cores_across_clouds();
        let num_queued_job_cores = cluster.num_queued_cores;
        let num_free_cluster_cores = cluster.num_free_cores;
        let num_down_cluster_cores = cluster.num_down_cores;
        let num_total_cluster_cores = cluster.num_total_cores;

        // Cores the cloud has already committed to but the scheduler hasn't
        // registered as cluster nodes yet.
        let num_pending_cores =
            num_valid_cloud_cores.saturating_sub(num_total_cluster_cores);

        debug!(
            num_valid_cloud_cores,
            num_queued_job_cores,
            num_free_cluster_cores,
            num_down_cluster_cores,
            num_total_cluster_cores,
            num_pending_cores,
            "on-demand++ tick"
        );

        let num_cores_to_launch = if num_queued_job_cores > 0 {
            num_queued_job_cores
                .saturating_sub(num_free_cluster_cores + num_pending_cores + num_down_cluster_cores)
        } else {
            0
        };
        debug!(num_cores_to_launch);

        if num_cores_to_launch > 0 {
            engine::launch_instances(registry, self.multiplier, num_cores_to_launch)
        } else {
            engine::terminate_idle_instances_before_charge(cluster, registry, self.loop_sleep_secs)
        }
    }
}
