//! The Cloud Adapter (component B): a single configured cloud's autoscale
//! group, abstracted behind [`CloudBackend`].

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::backend::CloudBackend;
use crate::config::CloudConfig;
use crate::error::CloudError;
use crate::instance::Instance;

/// A single cloud's autoscale group plus the stall-detection state machine
/// that governs whether Phorque still trusts it to launch instances.
pub struct Cloud {
    pub config: CloudConfig,
    backend: Box<dyn CloudBackend>,

    valid_instances: Vec<Instance>,
    desired_capacity: u32,
    pub maxed: bool,

    /// Set once three consecutive ticks have found no launch progress.
    pub failed_launch: bool,
    /// Consecutive stall ticks observed since the last progress or reset.
    pub failed_count: u32,
    /// Valid-instance count as of the last stall check. `None` until the
    /// launch procedure has observed this cloud at least once, so the very
    /// first observation always reads as progress rather than a stall.
    pub failed_last_valid_count: Option<u32>,

    pub last_launch_attempt: DateTime<Utc>,
}

impl Cloud {
    pub fn new(config: CloudConfig, backend: Box<dyn CloudBackend>) -> Self {
        Self {
            config,
            backend,
            valid_instances: Vec::new(),
            desired_capacity: 0,
            maxed: false,
            failed_launch: false,
            failed_count: 0,
            failed_last_valid_count: None,
            last_launch_attempt: Utc::now(),
        }
    }

    /// Refresh this cloud's instance list and desired capacity from its backend.
    pub fn refresh(&mut self) -> Result<(), CloudError> {
        debug!(cloud = %self.config.name, "refreshing cloud");
        let snapshot = self.backend.refresh()?;
        self.valid_instances = snapshot.instances.into_iter().filter(|i| i.is_valid()).collect();
        self.desired_capacity = snapshot.desired_capacity;
        self.maxed = self.valid_instances.len() as u32 >= self.config.max_instances;
        if self.maxed {
            warn!(
                cloud = %self.config.name,
                max_instances = self.config.max_instances,
                "cloud reached its max instances"
            );
        }
        Ok(())
    }

    pub fn valid_instances(&self) -> &[Instance] {
        &self.valid_instances
    }

    pub fn desired_capacity(&self) -> u32 {
        self.desired_capacity
    }

    pub fn total_valid_cores(&self) -> u32 {
        self.valid_instances.len() as u32 * self.config.instance_cores
    }

    pub fn instance_ids_for_hostnames(&self, hostnames: &[String]) -> Vec<String> {
        self.valid_instances
            .iter()
            .filter(|i| hostnames.contains(&i.hostname))
            .map(|i| i.id.clone())
            .collect()
    }

    /// Hostnames of valid instances within `3 * loop_sleep_secs` of their next
    /// hourly-billing boundary.
    pub fn hostnames_close_to_charge(&self, loop_sleep_secs: i64) -> Vec<String> {
        self.hostnames_close_to_charge_at(loop_sleep_secs, Utc::now())
    }

    fn hostnames_close_to_charge_at(
        &self,
        loop_sleep_secs: i64,
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let mut close = Vec::new();
        for instance in &self.valid_instances {
            let elapsed = (now - instance.launch_time).num_seconds();
            let charge_time = self.config.charge_time_secs;
            let cur_charge_secs = elapsed.rem_euclid(charge_time);
            let secs_to_charge = charge_time - cur_charge_secs;
            debug!(
                instance = %instance.id,
                hostname = %instance.hostname,
                secs_to_charge,
                "charge boundary check"
            );
            if secs_to_charge < 3 * loop_sleep_secs {
                close.push(instance.hostname.clone());
            }
        }
        close
    }

    /// Grow the autoscale group by `num_instances`, capped at `max_instances`.
    pub fn launch_autoscale(&mut self, num_instances: u32) -> Result<(), CloudError> {
        let mut new_capacity = self.desired_capacity + num_instances;
        if new_capacity > self.config.max_instances {
            warn!(
                cloud = %self.config.name,
                "capping launch request to max_instances ({})",
                self.config.max_instances
            );
            new_capacity = self.config.max_instances;
        }
        self.last_launch_attempt = Utc::now();
        self.set_capacity(new_capacity)
    }

    /// Terminate `instance_ids` outright, first lowering desired capacity if
    /// it currently exceeds the running instance count (so the autoscale
    /// group doesn't immediately relaunch what we just killed).
    pub fn delete_instances(&mut self, instance_ids: &[String]) -> Result<(), CloudError> {
        if instance_ids.is_empty() {
            return Ok(());
        }
        let num_instances = self.valid_instances.len() as u32;
        if self.desired_capacity > num_instances && num_instances > 0 {
            warn!(
                cloud = %self.config.name,
                "desired capacity exceeds running instances, lowering to match"
            );
            self.set_capacity(num_instances)?;
        }
        self.backend.terminate_instances(instance_ids)
    }

    pub fn set_capacity(&mut self, new_capacity: u32) -> Result<(), CloudError> {
        debug!(cloud = %self.config.name, new_capacity, "setting capacity");
        self.backend.set_capacity(new_capacity)?;
        self.desired_capacity = new_capacity;
        Ok(())
    }

    /// Reset the stall state machine after confirmed termination progress.
    pub fn reset_stall_state(&mut self) {
        self.failed_launch = false;
        self.failed_count = 0;
        self.failed_last_valid_count = None;
    }
}
