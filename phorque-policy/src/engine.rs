//! The Policy Engine (component D): the trait every scaling policy
//! implements, plus the shared launch/drain machinery policies build on.

use std::collections::HashSet;

use tracing::{debug, warn};

use phorque_cloud::CloudRegistry;
use phorque_cluster::Cluster;

use crate::error::PolicyError;

/// A named scaling strategy, selected at startup by config string.
///
/// `execute` is called once per control-loop tick with the freshly updated
/// cluster and cloud registry; a policy mutates both through their own
/// methods, never by reaching into their private fields.
pub trait Policy: Send {
    fn execute(&mut self, cluster: &mut Cluster, registry: &mut CloudRegistry) -> Result<(), PolicyError>;
}

/// Grow the cheapest usable cloud to cover `num_cores_to_launch`, or advance
/// its stall state machine if it already has an unfulfilled launch request.
///
/// Resolved semantics: a cloud is marked `Failed` the first time its launch
/// procedure runs after three stall ticks have been observed with no change
/// in valid instance count — i.e. `failed_count` reaches 3 on the third
/// stalled tick, and `failed_launch` is set the next time this function
/// finds `desired_capacity > valid_instances` for that cloud.
pub(crate) fn launch_instances(
    registry: &mut CloudRegistry,
    instance_cores_multiplier: u32,
    num_cores_to_launch: u32,
) -> Result<(), PolicyError> {
    let cloud = registry.cheapest_usable().ok_or(PolicyError::NoValidCloud)?;
    let num_valid_instances = cloud.valid_instances().len() as u32;

    if cloud.desired_capacity() > num_valid_instances {
        if cloud.failed_count >= 3 {
            warn!(cloud = %cloud.config.name, "cloud has stalled, marking failed");
            cloud.failed_launch = true;
            cloud.failed_count = 0;
            cloud.failed_last_valid_count = None;
            cloud.set_capacity(num_valid_instances)?;
        } else if cloud.failed_last_valid_count != Some(num_valid_instances) {
            debug!(cloud = %cloud.config.name, "cloud still appears to be launching");
            cloud.failed_last_valid_count = Some(num_valid_instances);
        } else {
            cloud.failed_count += 1;
            debug!(cloud = %cloud.config.name, failed_count = cloud.failed_count, "cloud appears stalled");
        }
        return Ok(());
    }

    let cores_per_instance = cloud.config.instance_cores;
    let num_instances = (num_cores_to_launch + cores_per_instance - 1) / cores_per_instance;
    let num_instances = num_instances * instance_cores_multiplier;
    debug!(cloud = %cloud.config.name, num_instances, "launching instances");
    cloud.launch_autoscale(num_instances)?;
    Ok(())
}

/// Offline nodes that are both idle/down and close to their next hourly
/// billing boundary, so they drain before the cluster pays for another hour.
pub(crate) fn mark_nodes_offline(cluster: &mut Cluster, registry: &CloudRegistry, loop_sleep_secs: i64) {
    let mut close_to_charge: HashSet<String> = HashSet::new();
    for cloud in registry.clouds_low_to_high() {
        close_to_charge.extend(cloud.hostnames_close_to_charge(loop_sleep_secs));
    }
    let idle_or_down: HashSet<String> = cluster
        .idle_or_down_hostnames(true)
        .into_iter()
        .collect();

    let to_offline: Vec<String> = close_to_charge.intersection(&idle_or_down).cloned().collect();
    debug!(?to_offline, "marking nodes offline");
    for hostname in to_offline {
        cluster.offline_node(&hostname);
    }
}

/// Terminate every node the cluster previously offlined and remove it from
/// the scheduler.
pub(crate) fn terminate_nodes(cluster: &mut Cluster, registry: &mut CloudRegistry) -> Result<(), PolicyError> {
    let to_terminate = cluster.hostnames_to_terminate();
    debug!(?to_terminate, "terminating nodes");

    for cloud in registry.clouds_low_to_high_mut() {
        let ids = cloud.instance_ids_for_hostnames(&to_terminate);
        if !ids.is_empty() {
            cloud.reset_stall_state();
        }
        cloud.delete_instances(&ids)?;
    }

    for hostname in &to_terminate {
        cluster.remove_node(hostname);
    }
    Ok(())
}

pub(crate) fn terminate_idle_instances_before_charge(
    cluster: &mut Cluster,
    registry: &mut CloudRegistry,
    loop_sleep_secs: i64,
) -> Result<(), PolicyError> {
    mark_nodes_offline(cluster, registry, loop_sleep_secs);
    terminate_nodes(cluster, registry)
}
