//! A concrete [`Ec2Client`] that shells out to the `aws` CLI, the same way
//! [`phorque_cluster::TorqueBackend`] shells out to `qstat`/`pbsnodes`.
//!
//! Clouds here are addressed by an explicit endpoint URL rather than an AWS
//! region, since a configured cloud may be a private, API-compatible
//! installation rather than public AWS.

use std::process::Command as ProcessCommand;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::CloudError;
use crate::ec2::Ec2Client;
use crate::instance::Instance;

/// Drives one autoscale group through the `aws` CLI against explicit
/// EC2/autoscaling endpoints and a fixed set of credentials.
pub struct AwsCliEc2Client {
    ec2_endpoint: String,
    autoscale_endpoint: String,
    region: String,
    access_id: String,
    secret_key: String,
}

impl AwsCliEc2Client {
    pub fn new(
        ec2_endpoint: impl Into<String>,
        autoscale_endpoint: impl Into<String>,
        region: impl Into<String>,
        access_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            ec2_endpoint: ec2_endpoint.into(),
            autoscale_endpoint: autoscale_endpoint.into(),
            region: region.into(),
            access_id: access_id.into(),
            secret_key: secret_key.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Value, CloudError> {
        let output = ProcessCommand::new("aws")
            .args(args)
            .env("AWS_ACCESS_KEY_ID", &self.access_id)
            .env("AWS_SECRET_ACCESS_KEY", &self.secret_key)
            .output()
            .map_err(|e| CloudError::RequestFailed {
                cloud: self.region.clone(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(CloudError::RequestFailed {
                cloud: self.region.clone(),
                reason: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        serde_json::from_slice(&output.stdout).map_err(|e| CloudError::RequestFailed {
            cloud: self.region.clone(),
            reason: format!("unparsable aws CLI output: {e}"),
        })
    }

    /// Like [`Self::run`], but for commands that print nothing on success
    /// (e.g. `set-desired-capacity`) — skips the JSON parse entirely.
    fn run_unit(&self, args: &[&str]) -> Result<(), CloudError> {
        let output = ProcessCommand::new("aws")
            .args(args)
            .env("AWS_ACCESS_KEY_ID", &self.access_id)
            .env("AWS_SECRET_ACCESS_KEY", &self.secret_key)
            .output()
            .map_err(|e| CloudError::RequestFailed {
                cloud: self.region.clone(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(CloudError::RequestFailed {
                cloud: self.region.clone(),
                reason: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

impl Ec2Client for AwsCliEc2Client {
    fn describe_autoscaling_instances(
        &mut self,
        autoscale_group_name: &str,
    ) -> Result<Vec<Instance>, CloudError> {
        let asg = self.run(&[
            "autoscaling",
            "describe-auto-scaling-groups",
            "--auto-scaling-group-names",
            autoscale_group_name,
            "--endpoint-url",
            &self.autoscale_endpoint,
            "--region",
            &self.region,
            "--output",
            "json",
        ])?;

        let group = asg["AutoScalingGroups"]
            .as_array()
            .and_then(|groups| groups.first())
            .ok_or_else(|| CloudError::AutoscaleGroupUnavailable(autoscale_group_name.to_string()))?;

        let instance_ids: Vec<String> = group["Instances"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|i| i["InstanceId"].as_str().map(str::to_string))
            .collect();
        if instance_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = vec![
            "ec2".to_string(),
            "describe-instances".to_string(),
            "--instance-ids".to_string(),
        ];
        args.extend(instance_ids);
        args.extend(
            [
                "--endpoint-url",
                &self.ec2_endpoint,
                "--region",
                &self.region,
                "--output",
                "json",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let described = self.run(&arg_refs)?;

        let mut instances = Vec::new();
        for reservation in described["Reservations"].as_array().into_iter().flatten() {
            for instance in reservation["Instances"].as_array().into_iter().flatten() {
                let id = instance["InstanceId"].as_str().unwrap_or_default().to_string();
                let hostname = instance["PublicDnsName"].as_str().unwrap_or_default().to_string();
                let run_state = instance["State"]["Name"].as_str().unwrap_or_default().to_string();
                let launch_time = match instance["LaunchTime"].as_str() {
                    Some(s) => DateTime::parse_from_rfc3339(s)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| CloudError::InvalidLaunchTime(format!("{s}: {e}")))?,
                    // Pending instances legitimately have no LaunchTime yet.
                    None => Utc::now(),
                };
                instances.push(Instance::new(id, hostname, run_state, launch_time));
            }
        }
        Ok(instances)
    }

    fn describe_desired_capacity(&mut self, autoscale_group_name: &str) -> Result<u32, CloudError> {
        let asg = self.run(&[
            "autoscaling",
            "describe-auto-scaling-groups",
            "--auto-scaling-group-names",
            autoscale_group_name,
            "--endpoint-url",
            &self.autoscale_endpoint,
            "--region",
            &self.region,
            "--output",
            "json",
        ])?;
        let group = asg["AutoScalingGroups"]
            .as_array()
            .and_then(|groups| groups.first())
            .ok_or_else(|| CloudError::AutoscaleGroupUnavailable(autoscale_group_name.to_string()))?;
        group["DesiredCapacity"]
            .as_u64()
            .map(|n| n as u32)
            .ok_or_else(|| CloudError::RequestFailed {
                cloud: self.region.clone(),
                reason: "missing DesiredCapacity in autoscaling group description".to_string(),
            })
    }

    fn set_desired_capacity(
        &mut self,
        autoscale_group_name: &str,
        capacity: u32,
    ) -> Result<(), CloudError> {
        let capacity_str = capacity.to_string();
        self.run_unit(&[
            "autoscaling",
            "set-desired-capacity",
            "--auto-scaling-group-name",
            autoscale_group_name,
            "--desired-capacity",
            &capacity_str,
            "--endpoint-url",
            &self.autoscale_endpoint,
            "--region",
            &self.region,
        ])
    }

    fn terminate_instances(&mut self, instance_ids: &[String]) -> Result<(), CloudError> {
        if instance_ids.is_empty() {
            return Ok(());
        }
        let mut args = vec!["ec2".to_string(), "terminate-instances".to_string(), "--instance-ids".to_string()];
        args.extend(instance_ids.iter().cloned());
        args.extend(
            [
                "--endpoint-url".to_string(),
                self.ec2_endpoint.clone(),
                "--region".to_string(),
                self.region.clone(),
            ],
        );
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&arg_refs)?;
        Ok(())
    }
}
