//! A [`CloudBackend`] for EC2-style autoscale groups.
//!
//! The actual HTTP/SDK calls are hidden behind [`Ec2Client`] so this module
//! stays testable without a network; a real deployment wires in a client
//! backed by an AWS SDK autoscaling/EC2 API pair.

use crate::backend::{CloudBackend, CloudSnapshot};
use crate::error::CloudError;
use crate::instance::Instance;

/// The narrow slice of an autoscale-group API that [`Ec2Backend`] needs.
///
/// Mirrors the calls the original tooling made against `boto`'s
/// `AutoScaleConnection` and `EC2Connection`: list instances for a group,
/// read/set desired capacity, and terminate by instance id.
pub trait Ec2Client: Send {
    fn describe_autoscaling_instances(
        &mut self,
        autoscale_group_name: &str,
    ) -> Result<Vec<Instance>, CloudError>;

    fn describe_desired_capacity(&mut self, autoscale_group_name: &str) -> Result<u32, CloudError>;

    fn set_desired_capacity(
        &mut self,
        autoscale_group_name: &str,
        capacity: u32,
    ) -> Result<(), CloudError>;

    fn terminate_instances(&mut self, instance_ids: &[String]) -> Result<(), CloudError>;
}

/// Drives a single autoscale group through an [`Ec2Client`].
pub struct Ec2Backend {
    autoscale_group_name: String,
    client: Box<dyn Ec2Client>,
}

impl Ec2Backend {
    pub fn new(autoscale_group_name: impl Into<String>, client: Box<dyn Ec2Client>) -> Self {
        Self {
            autoscale_group_name: autoscale_group_name.into(),
            client,
        }
    }
}

impl CloudBackend for Ec2Backend {
    fn refresh(&mut self) -> Result<CloudSnapshot, CloudError> {
        let instances = self
            .client
            .describe_autoscaling_instances(&self.autoscale_group_name)?;
        let desired_capacity = self
            .client
            .describe_desired_capacity(&self.autoscale_group_name)?;
        Ok(CloudSnapshot {
            instances,
            desired_capacity,
        })
    }

    fn set_capacity(&mut self, new_capacity: u32) -> Result<(), CloudError> {
        self.client
            .set_desired_capacity(&self.autoscale_group_name, new_capacity)
    }

    fn terminate_instances(&mut self, instance_ids: &[String]) -> Result<(), CloudError> {
        self.client.terminate_instances(instance_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeEc2Client {
        instances: Vec<Instance>,
        desired_capacity: u32,
        set_capacity_calls: Arc<Mutex<Vec<u32>>>,
        terminate_calls: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl Ec2Client for FakeEc2Client {
        fn describe_autoscaling_instances(
            &mut self,
            _group: &str,
        ) -> Result<Vec<Instance>, CloudError> {
            Ok(self.instances.clone())
        }
        fn describe_desired_capacity(&mut self, _group: &str) -> Result<u32, CloudError> {
            Ok(self.desired_capacity)
        }
        fn set_desired_capacity(&mut self, _group: &str, capacity: u32) -> Result<(), CloudError> {
            self.set_capacity_calls.lock().unwrap().push(capacity);
            Ok(())
        }
        fn terminate_instances(&mut self, ids: &[String]) -> Result<(), CloudError> {
            self.terminate_calls.lock().unwrap().push(ids.to_vec());
            Ok(())
        }
    }

    #[test]
    fn refresh_combines_instances_and_capacity() {
        let client = FakeEc2Client {
            instances: vec![Instance::new("i-1", "h-1", "running", Utc::now())],
            desired_capacity: 2,
            ..Default::default()
        };
        let mut backend = Ec2Backend::new("asg-a", Box::new(client));
        let snapshot = backend.refresh().unwrap();
        assert_eq!(snapshot.instances.len(), 1);
        assert_eq!(snapshot.desired_capacity, 2);
    }

    #[test]
    fn set_capacity_and_terminate_delegate_to_client() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let term_calls = Arc::new(Mutex::new(Vec::new()));
        let client = FakeEc2Client {
            set_capacity_calls: calls.clone(),
            terminate_calls: term_calls.clone(),
            ..Default::default()
        };
        let mut backend = Ec2Backend::new("asg-a", Box::new(client));
        backend.set_capacity(5).unwrap();
        backend.terminate_instances(&["i-1".to_string()]).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![5]);
        assert_eq!(*term_calls.lock().unwrap(), vec![vec!["i-1".to_string()]]);
    }
}
