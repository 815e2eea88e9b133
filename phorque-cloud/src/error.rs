//! Error type for the Cloud Adapter and Cloud Registry (components B and C).

use thiserror::Error;

/// Errors surfaced by a [`crate::backend::CloudBackend`] or by [`crate::Cloud`]
/// while talking to an IaaS control plane.
#[derive(Error, Debug)]
pub enum CloudError {
    /// The cloud's API rejected or could not complete a request.
    #[error("cloud `{cloud}` request failed: {reason}")]
    RequestFailed { cloud: String, reason: String },

    /// The autoscale group or launch configuration named in the config section
    /// could not be found or created.
    #[error("autoscale group `{0}` not found and could not be created")]
    AutoscaleGroupUnavailable(String),

    /// An instance's `launch_time` did not parse as RFC 3339.
    #[error("failed to parse instance launch time: {0}")]
    InvalidLaunchTime(String),
}
