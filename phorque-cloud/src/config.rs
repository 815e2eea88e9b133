//! Per-cloud configuration (one config-file section per configured cloud).

/// Static, validated settings for a single configured cloud.
///
/// `access_id`/`secret_key` arrive from [`phorque_config`] already resolved
/// through `$ENV_VAR` indirection; this struct only ever sees plain values.
#[derive(Debug, Clone)]
pub struct CloudConfig {
    pub name: String,
    pub image_id: String,
    pub launch_config_name: String,
    pub autoscale_group_name: String,
    pub price: f64,
    pub cloud_uri: String,
    pub cloud_port: u16,
    pub autoscale_uri: String,
    pub autoscale_port: u16,
    pub cloud_type: String,
    pub availability_zone: String,
    pub instance_type: String,
    pub instance_cores: u32,
    pub max_instances: u32,
    pub charge_time_secs: i64,
    pub access_id: String,
    pub secret_key: String,
}
