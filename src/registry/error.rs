//! Errors for the process registry.

use crate::feature::FeatureKey;
use std::path::PathBuf;

/// Errors that can occur while spawning or terminating feature processes.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The OS refused to spawn the feature's entry point.
    #[error("failed to spawn {key}: {source}")]
    SpawnFailed {
        key: FeatureKey,
        #[source]
        source: std::io::Error,
    },

    /// The configured entry script does not exist.
    #[error("entry point for {key} not found: {}", path.display())]
    EntryNotFound {
        key: FeatureKey,
        path: PathBuf,
    },

    /// The feature does not run as a child process.
    #[error("{key} is not a process-backed feature")]
    NotSpawnable {
        key: FeatureKey,
    },

    /// Graceful and forced termination both failed.
    #[error("failed to terminate {key}: {reason}")]
    TerminationFailed {
        key: FeatureKey,
        /// What went wrong during the termination sequence.
        reason: String,
    },

    /// Waiting on the child failed.
    #[error("failed to wait for {key}: {source}")]
    Wait {
        key: FeatureKey,
        #[source]
        source: std::io::Error,
    },
}
