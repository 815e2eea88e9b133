//! End-to-end scenarios driving the full Cluster / CloudRegistry / Policy
//! stack against fake backends, mirroring real scheduler/cloud behavior tick
//! by tick.

use chrono::{Duration, Utc};

use phorque_cloud::{Cloud, CloudBackend, CloudConfig, CloudRegistry, CloudSnapshot, Instance};
use phorque_cluster::{Cluster, ClusterBackend, ClusterError, ClusterUpdate, Node};
use phorque_policy::{OnDemandPlusPlus, Policy};

struct ScriptedClusterBackend {
    ticks: Vec<ClusterUpdate>,
    idx: usize,
}

impl ScriptedClusterBackend {
    fn new(ticks: Vec<ClusterUpdate>) -> Self {
        Self { ticks, idx: 0 }
    }
}

impl ClusterBackend for ScriptedClusterBackend {
    fn update(&mut self) -> Result<ClusterUpdate, ClusterError> {
        let tick = self
            .ticks
            .get(self.idx)
            .cloned()
            .unwrap_or_else(|| self.ticks.last().cloned().unwrap_or_default());
        self.idx += 1;
        Ok(tick)
    }
    fn add_node(&mut self, _hostname: &str, _np: u32) -> Result<(), ClusterError> {
        Ok(())
    }
    fn remove_node(&mut self, _hostname: &str) -> Result<(), ClusterError> {
        Ok(())
    }
    fn offline_node(&mut self, _hostname: &str) -> Result<(), ClusterError> {
        Ok(())
    }
}

struct ScriptedCloudBackend {
    instances: Vec<Instance>,
    desired_capacity: u32,
}

impl CloudBackend for ScriptedCloudBackend {
    fn refresh(&mut self) -> Result<CloudSnapshot, phorque_cloud::CloudError> {
        Ok(CloudSnapshot {
            instances: self.instances.clone(),
            desired_capacity: self.desired_capacity,
        })
    }
    fn set_capacity(&mut self, new_capacity: u32) -> Result<(), phorque_cloud::CloudError> {
        self.desired_capacity = new_capacity;
        Ok(())
    }
    fn terminate_instances(&mut self, ids: &[String]) -> Result<(), phorque_cloud::CloudError> {
        self.instances.retain(|i| !ids.contains(&i.id));
        Ok(())
    }
}

fn cloud_config(name: &str, price: f64, cores: u32, max_instances: u32, charge_time_secs: i64) -> CloudConfig {
    CloudConfig {
        name: name.into(),
        image_id: "ami".into(),
        launch_config_name: "lc".into(),
        autoscale_group_name: format!("{name}-asg"),
        price,
        cloud_uri: "ec2.example.com".into(),
        cloud_port: 443,
        autoscale_uri: "as.example.com".into(),
        autoscale_port: 443,
        cloud_type: "us-east-1".into(),
        availability_zone: "us-east-1a".into(),
        instance_type: "m1.small".into(),
        instance_cores: cores,
        max_instances,
        charge_time_secs,
        access_id: "id".into(),
        secret_key: "key".into(),
    }
}

fn cloud(name: &str, price: f64, cores: u32, max_instances: u32, desired_capacity: u32, instances: Vec<Instance>) -> Cloud {
    let backend = ScriptedCloudBackend {
        instances,
        desired_capacity,
    };
    Cloud::new(cloud_config(name, price, cores, max_instances, 3600), Box::new(backend))
}

#[test]
fn scale_up_from_cold_chooses_cheapest_cloud() {
    let a = cloud("A", 0.10, 2, 10, 0, vec![]);
    let b = cloud("B", 0.20, 4, 10, 0, vec![]);
    let mut registry = CloudRegistry::new(vec![b, a]);
    for c in registry.clouds_low_to_high_mut() {
        c.refresh().unwrap();
    }

    let mut cluster = Cluster::new(Box::new(ScriptedClusterBackend::new(vec![ClusterUpdate::default()])));
    cluster.update().unwrap();
    cluster.num_queued_cores = 6;

    let mut policy = OnDemandPlusPlus::new(1, 60);
    policy.execute(&mut cluster, &mut registry).unwrap();

    let picked = &registry.clouds_low_to_high()[0];
    assert_eq!(picked.config.name, "A");
    assert_eq!(picked.desired_capacity(), 3);
}

#[test]
fn pending_debit_then_progress_then_stall_to_failed() {
    let a = cloud("A", 0.10, 2, 10, 3, vec![]);
    let b = cloud("B", 0.20, 4, 10, 0, vec![]);
    let mut registry = CloudRegistry::new(vec![b, a]);
    for c in registry.clouds_low_to_high_mut() {
        c.refresh().unwrap();
    }

    let mut cluster = Cluster::new(Box::new(ScriptedClusterBackend::new(vec![ClusterUpdate::default()])));
    cluster.update().unwrap();
    cluster.num_queued_cores = 6;

    let mut policy = OnDemandPlusPlus::new(1, 60);

    // Tick 2: pending debit, first observation of valid=0.
    policy.execute(&mut cluster, &mut registry).unwrap();
    {
        let a_cloud = registry.clouds_low_to_high().iter().find(|c| c.config.name == "A").unwrap();
        assert_eq!(a_cloud.failed_count, 0);
    }

    // Tick 3: progress — valid instances now 2, baseline resets.
    {
        let a_cloud = registry
            .clouds_low_to_high_mut()
            .iter_mut()
            .find(|c| c.config.name == "A")
            .unwrap();
        let two_instances = vec![
            Instance::new("i-1", "h-1", "running", Utc::now()),
            Instance::new("i-2", "h-2", "running", Utc::now()),
        ];
        // Swap in a backend reporting 2 running instances.
        *a_cloud = cloud("A", 0.10, 2, 10, 3, two_instances);
        a_cloud.refresh().unwrap();
    }
    policy.execute(&mut cluster, &mut registry).unwrap();
    {
        let a_cloud = registry.clouds_low_to_high().iter().find(|c| c.config.name == "A").unwrap();
        assert_eq!(a_cloud.failed_count, 0);
    }

    // Ticks 4-6: stuck at valid=2, desired=3 — three stall ticks.
    for expected_failed_count in 1..=3 {
        policy.execute(&mut cluster, &mut registry).unwrap();
        let a_cloud = registry.clouds_low_to_high().iter().find(|c| c.config.name == "A").unwrap();
        assert_eq!(a_cloud.failed_count, expected_failed_count);
        assert!(!a_cloud.failed_launch);
    }

    // Tick 7: evaluation tick — failed_count >= 3 flips failed_launch.
    policy.execute(&mut cluster, &mut registry).unwrap();
    let a_cloud = registry.clouds_low_to_high().iter().find(|c| c.config.name == "A").unwrap();
    assert!(a_cloud.failed_launch);
    assert_eq!(a_cloud.desired_capacity(), 2);

    // Subsequent ticks should prefer B, since A is no longer usable.
    let cheapest = registry.cheapest_usable().unwrap();
    assert_eq!(cheapest.config.name, "B");
}

#[test]
fn drain_near_charge_terminates_and_resets_failure_counters() {
    let launch_time = Utc::now() - Duration::seconds(3590);
    let instance = Instance::new("i-1", "host-1", "running", launch_time);
    let mut a = cloud("A", 0.10, 2, 10, 1, vec![instance]);
    a.refresh().unwrap();
    a.failed_launch = true;
    a.failed_count = 2;

    let mut registry = CloudRegistry::new(vec![a]);

    let node = Node::new("host-1", 2, "free");
    let mut cluster_backend = ScriptedClusterBackend::new(vec![ClusterUpdate {
        num_queued_jobs: 0,
        num_queued_cores: 0,
        num_total_jobs: 0,
        nodes: vec![node],
    }]);
    let _ = &mut cluster_backend;
    let mut cluster = Cluster::new(Box::new(cluster_backend));
    cluster.update().unwrap();
    assert!(cluster.has_booted("host-1"));

    let mut policy = OnDemandPlusPlus::new(1, 60);
    policy.execute(&mut cluster, &mut registry).unwrap();

    let a_cloud = &registry.clouds_low_to_high()[0];
    assert!(!a_cloud.failed_launch);
    assert_eq!(a_cloud.failed_count, 0);
    assert!(a_cloud.valid_instances().is_empty());
}

#[test]
fn reconcile_requires_two_consecutive_misses_before_removal() {
    let a = cloud("A", 0.10, 2, 10, 0, vec![]);
    let mut registry = CloudRegistry::new(vec![a]);

    let node = Node::new("H", 2, "free");
    let mut cluster = Cluster::new(Box::new(ScriptedClusterBackend::new(vec![ClusterUpdate {
        num_queued_jobs: 0,
        num_queued_cores: 0,
        num_total_jobs: 0,
        nodes: vec![node],
    }])));
    cluster.update().unwrap();

    registry.refresh_all(&mut cluster);
    assert_eq!(cluster.nodes.len(), 1, "first miss should only flag H as out of date");

    registry.refresh_all(&mut cluster);
    assert_eq!(cluster.nodes.len(), 0, "second consecutive miss should remove H");
}

#[test]
fn empty_queue_steady_state_performs_no_mutations() {
    let a = cloud("A", 0.10, 2, 10, 0, vec![]);
    let mut registry = CloudRegistry::new(vec![a]);
    for c in registry.clouds_low_to_high_mut() {
        c.refresh().unwrap();
    }

    let mut cluster = Cluster::new(Box::new(ScriptedClusterBackend::new(vec![ClusterUpdate::default()])));
    cluster.update().unwrap();

    let mut policy = OnDemandPlusPlus::new(1, 60);
    policy.execute(&mut cluster, &mut registry).unwrap();

    let a_cloud = &registry.clouds_low_to_high()[0];
    assert_eq!(a_cloud.desired_capacity(), 0);
    assert!(a_cloud.valid_instances().is_empty());
}
