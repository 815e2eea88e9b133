//! Loads an INI-shaped config file into an [`AppConfig`].

use std::collections::HashMap;

use config::{Config, File, FileFormat, Value};
use tracing::debug;

use crate::error::ConfigError;
use crate::settings::{AppConfig, CloudSectionConfig, PhorqueSection, PolicySection, STATIC_SECTIONS};

/// Resolve `$ENV_VAR`-style indirection: a value beginning with `$` is
/// looked up in the environment (stripped of its leading `$`); if the
/// variable isn't set, the original string — `$` included — is kept as-is,
/// matching how the original tooling degrades.
fn resolve_env_indirection(raw: &str) -> String {
    match raw.strip_prefix('$') {
        Some(var_name) => std::env::var(var_name).unwrap_or_else(|_| raw.to_string()),
        None => raw.to_string(),
    }
}

fn get_string(table: &HashMap<String, Value>, section: &str, key: &str) -> Result<String, ConfigError> {
    table
        .get(key)
        .and_then(|v| v.clone().into_string().ok())
        .ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
}

fn get_int(table: &HashMap<String, Value>, section: &str, key: &str) -> Result<i64, ConfigError> {
    let raw = get_string(table, section, key)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("`{raw}` is not an integer"),
    })
}

fn get_float(table: &HashMap<String, Value>, section: &str, key: &str) -> Result<f64, ConfigError> {
    let raw = get_string(table, section, key)?;
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        reason: format!("`{raw}` is not a number"),
    })
}

fn section_table(
    cfg: &HashMap<String, Value>,
    section: &str,
) -> Result<HashMap<String, Value>, ConfigError> {
    let value = cfg.get(section).ok_or_else(|| ConfigError::MissingKey {
        section: section.to_string(),
        key: "<section>".to_string(),
    })?;
    value
        .clone()
        .into_table()
        .map_err(|e| ConfigError::Read {
            path: section.to_string(),
            source: e,
        })
}

fn parse_cloud_section(name: &str, table: &HashMap<String, Value>) -> Result<CloudSectionConfig, ConfigError> {
    Ok(CloudSectionConfig {
        name: name.to_string(),
        image_id: get_string(table, name, "image_id")?,
        launch_config_name: get_string(table, name, "launch_config_name")?,
        autoscale_group_name: get_string(table, name, "autoscale_group_name")?,
        price: get_float(table, name, "price")?,
        cloud_uri: get_string(table, name, "cloud_uri")?,
        cloud_port: get_int(table, name, "cloud_port")? as u16,
        autoscale_uri: get_string(table, name, "autoscale_uri")?,
        autoscale_port: get_int(table, name, "autoscale_port")? as u16,
        cloud_type: get_string(table, name, "cloud_type")?,
        availability_zone: get_string(table, name, "availability_zone")?,
        instance_type: get_string(table, name, "instance_type")?,
        instance_cores: get_int(table, name, "instance_cores")? as u32,
        max_instances: get_int(table, name, "max_instances")? as u32,
        charge_time_secs: get_int(table, name, "charge_time_secs")?,
        access_id: resolve_env_indirection(&get_string(table, name, "access_id")?),
        secret_key: resolve_env_indirection(&get_string(table, name, "secret_key")?),
    })
}

/// Load and fully validate a Phorque config file.
pub fn load(path: &str) -> Result<AppConfig, ConfigError> {
    debug!(path, "loading config file");
    let cfg = Config::builder()
        .add_source(File::new(path, FileFormat::Ini))
        .build()
        .map_err(|e| ConfigError::Read {
            path: path.to_string(),
            source: e,
        })?;

    let top_level: HashMap<String, Value> = cfg.try_deserialize().map_err(|e| ConfigError::Read {
        path: path.to_string(),
        source: e,
    })?;

    let phorque_table = section_table(&top_level, "Phorque")?;
    let phorque = PhorqueSection {
        loop_sleep_secs: get_int(&phorque_table, "Phorque", "loop_sleep_secs")?,
        cluster_directory: get_string(&phorque_table, "Phorque", "cluster_directory")?,
    };

    let policy_table = section_table(&top_level, "Policy")?;
    let policy = PolicySection {
        name: get_string(&policy_table, "Policy", "name")?,
        multiplier: get_int(&policy_table, "Policy", "multiplier")? as u32,
    };

    let mut clouds = Vec::new();
    for (section_name, value) in &top_level {
        if STATIC_SECTIONS.contains(&section_name.as_str()) {
            continue;
        }
        let table = value.clone().into_table().map_err(|e| ConfigError::Read {
            path: section_name.to_string(),
            source: e,
        })?;
        clouds.push(parse_cloud_section(section_name, &table)?);
    }
    if clouds.is_empty() {
        return Err(ConfigError::NoCloudsConfigured);
    }

    debug!(cloud_count = clouds.len(), "config loaded");
    Ok(AppConfig {
        phorque,
        policy,
        clouds,
    })
}
