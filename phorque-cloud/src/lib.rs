//! Components B and C: the Cloud Adapter and the Cloud Registry.
//!
//! A [`Cloud`] wraps one configured autoscale group behind [`CloudBackend`];
//! a [`CloudRegistry`] holds every configured cloud, price-ordered, and
//! reconciles their instances against the Cluster Adapter's node list.

mod aws_cli;
mod backend;
mod cloud;
mod config;
mod ec2;
mod error;
mod instance;
mod registry;

pub use aws_cli::AwsCliEc2Client;
pub use backend::{CloudBackend, CloudSnapshot};
pub use cloud::Cloud;
pub use config::CloudConfig;
pub use ec2::{Ec2Backend, Ec2Client};
pub use error::CloudError;
pub use instance::{Instance, VALID_RUN_STATES};
pub use registry::CloudRegistry;
