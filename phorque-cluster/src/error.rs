//! Error type for the Cluster Adapter (component A).

use thiserror::Error;

/// Errors surfaced by a [`crate::backend::ClusterBackend`] or by [`crate::Cluster`]
/// while talking to the external batch scheduler.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// An external scheduler command exited with a non-zero status.
    #[error("scheduler command `{command}` exited with status {status}")]
    CommandFailed { command: String, status: i32 },

    /// The scheduler's output did not match the expected shape.
    #[error("failed to parse scheduler output: {0}")]
    ParseFailed(String),

    /// The configured `cluster_directory` does not contain the expected binaries.
    #[error("cluster directory not found: {0}")]
    DirectoryNotFound(String),

    /// Spawning or communicating with a scheduler command failed at the OS level.
    #[error("io error running scheduler command: {0}")]
    Io(#[from] std::io::Error),
}
