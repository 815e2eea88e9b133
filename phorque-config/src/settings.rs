//! Typed configuration sections.

/// The `[Phorque]` section: control-loop and scheduler settings.
#[derive(Debug, Clone)]
pub struct PhorqueSection {
    pub loop_sleep_secs: i64,
    pub cluster_directory: String,
}

/// The `[Policy]` section: which policy to run, and its tuning knob.
#[derive(Debug, Clone)]
pub struct PolicySection {
    pub name: String,
    pub multiplier: u32,
}

/// One dynamically named cloud section (e.g. `[hotel]`, `[east]`).
#[derive(Debug, Clone)]
pub struct CloudSectionConfig {
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

/// The fully parsed config file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub phorque: PhorqueSection,
    pub policy: PolicySection,
    pub clouds: Vec<CloudSectionConfig>,
}

/// Section names that are fixed, singular, and never treated as a cloud.
pub const STATIC_SECTIONS: &[&str] = &["Phorque", "Policy"];
