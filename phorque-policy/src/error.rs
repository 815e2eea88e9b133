//! Error type for the Policy Engine (component D).

use thiserror::Error;

use phorque_cloud::CloudError;

/// Errors surfaced while a [`crate::Policy`] drives the cluster and cloud
/// registry toward its target capacity.
#[derive(Error, Debug)]
pub enum PolicyError {
    /// No cloud is both unfailed and under its instance cap.
    #[error("no valid cloud remaining, cannot launch instances")]
    NoValidCloud,

    /// A cloud operation the policy depends on failed.
    #[error("cloud operation failed: {0}")]
    Cloud(#[from] CloudError),
}
