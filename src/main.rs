//! Phorque: an elastic cluster autoscaler bridging a batch job scheduler and
//! one or more IaaS clouds.
//!
//! This binary wires together the four components described in the crate
//! layout — the Cluster Adapter, the Cloud Adapter/Registry, the Policy
//! Engine, and configuration loading — and drives them through a single
//! control loop (component E) until asked to shut down.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};

use phorque_cloud::{AwsCliEc2Client, Cloud, CloudConfig, CloudRegistry, Ec2Backend};
use phorque_cluster::{Cluster, ClusterError, TorqueBackend};
use phorque_config::{AppConfig, Cli};
use phorque_policy::{OnDemand, OnDemandPlusPlus, Policy};

fn init_logging(debug_enabled: bool) {
    let default_level = if debug_enabled { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("phorque={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_cluster(cluster_directory: &str) -> Result<Cluster> {
    if !Path::new(cluster_directory).exists() {
        return Err(ClusterError::DirectoryNotFound(cluster_directory.to_string()).into());
    }
    let backend = TorqueBackend::new(cluster_directory);
    Ok(Cluster::new(Box::new(backend)))
}

fn build_cloud(section: &phorque_config::CloudSectionConfig) -> Cloud {
    let config = CloudConfig {
        name: section.name.clone(),
        image_id: section.image_id.clone(),
        launch_config_name: section.launch_config_name.clone(),
        autoscale_group_name: section.autoscale_group_name.clone(),
        price: section.price,
        cloud_uri: section.cloud_uri.clone(),
        cloud_port: section.cloud_port,
        autoscale_uri: section.autoscale_uri.clone(),
        autoscale_port: section.autoscale_port,
        cloud_type: section.cloud_type.clone(),
        availability_zone: section.availability_zone.clone(),
        instance_type: section.instance_type.clone(),
        instance_cores: section.instance_cores,
        max_instances: section.max_instances,
        charge_time_secs: section.charge_time_secs,
        access_id: section.access_id.clone(),
        secret_key: section.secret_key.clone(),
    };

    let ec2_endpoint = format!("https://{}:{}", section.cloud_uri, section.cloud_port);
    let autoscale_endpoint = format!("https://{}:{}", section.autoscale_uri, section.autoscale_port);
    let client = AwsCliEc2Client::new(
        ec2_endpoint,
        autoscale_endpoint,
        section.cloud_type.clone(),
        section.access_id.clone(),
        section.secret_key.clone(),
    );
    let backend = Ec2Backend::new(section.autoscale_group_name.clone(), Box::new(client));
    Cloud::new(config, Box::new(backend))
}

fn build_policy(config: &AppConfig) -> Result<Box<dyn Policy>> {
    match config.policy.name.as_str() {
        "OnDemand" => Ok(Box::new(OnDemand::new())),
        "OnDemandPlusPlus" => Ok(Box::new(OnDemandPlusPlus::new(
            config.policy.multiplier,
            config.phorque.loop_sleep_secs,
        ))),
        other => anyhow::bail!("unknown policy `{other}`"),
    }
}

/// Sleep for `total_secs`, waking once a second to check `shutdown`, so a
/// signal lands within a second even mid-sleep.
async fn interruptible_sleep(total_secs: i64, shutdown: &AtomicBool) {
    for _ in 0..total_secs.max(0) {
        if shutdown.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

async fn run_control_loop(
    mut cluster: Cluster,
    mut registry: CloudRegistry,
    mut policy: Box<dyn Policy>,
    loop_sleep_secs: i64,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match cluster.update() {
            Ok(()) => info!("successfully updated cluster information"),
            Err(e) => error!(error = %e, "error updating cluster information"),
        }

        registry.refresh_all(&mut cluster);
        info!("refreshed all clouds");

        match policy.execute(&mut cluster, &mut registry) {
            Ok(()) => info!("successfully executed policy"),
            Err(e) => error!(error = %e, "error executing policy"),
        }

        debug!(loop_sleep_secs, "sleeping");
        interruptible_sleep(loop_sleep_secs, &shutdown).await;
    }
    info!("shutdown requested, exiting control loop");
}

async fn watch_for_shutdown(shutdown: Arc<AtomicBool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "unable to install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received, exiting at the next possible time");
    shutdown.store(true, Ordering::SeqCst);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = phorque_config::load(&cli.config_file)
        .with_context(|| format!("failed to load config file {}", cli.config_file))?;

    let cluster = build_cluster(&config.phorque.cluster_directory)
        .context("failed to configure cluster adapter")?;

    let clouds: Vec<Cloud> = config.clouds.iter().map(build_cloud).collect();
    let registry = CloudRegistry::new(clouds);

    let policy = build_policy(&config)?;

    info!(policy = %config.policy.name, clouds = config.clouds.len(), "starting phorque");

    let shutdown = Arc::new(AtomicBool::new(false));
    let signal_task = tokio::spawn(watch_for_shutdown(shutdown.clone()));

    run_control_loop(
        cluster,
        registry,
        policy,
        config.phorque.loop_sleep_secs,
        shutdown,
    )
    .await;

    signal_task.abort();
    Ok(())
}
