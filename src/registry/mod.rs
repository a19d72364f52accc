//! Process registry: at most one live child process per feature key.
//!
//! The registry is owned by the controller and is its only writer. Starting a
//! feature that is already running returns the existing handle; stopping
//! always drops the entry, even if termination fails.

mod error;
mod handle;

pub use error::RegistryError;
pub use handle::{ProcessHandle, Termination};

use crate::config::FeaturesConfig;
use crate::feature::FeatureKey;
use std::collections::HashMap;
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tracing::{info, warn};

/// Liveness of a feature as reported by [`ProcessRegistry::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureStatus {
    Running,
    Stopped,
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
        })
    }
}

/// Result of [`ProcessRegistry::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No handle was tracked for the key.
    NotTracked,
    /// A handle was tracked and the termination sequence ran.
    Stopped(Termination),
}

/// Table of live feature processes.
#[derive(Debug)]
pub struct ProcessRegistry {
    features: FeaturesConfig,
    grace: Duration,
    handles: HashMap<FeatureKey, ProcessHandle>,
}

impl ProcessRegistry {
    pub fn new(features: FeaturesConfig, grace: Duration) -> Self {
        Self {
            features,
            grace,
            handles: HashMap::new(),
        }
    }

    /// Starts `key` unless a live process already exists, returning its PID.
    ///
    /// A dead handle left over from an earlier run is replaced.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NotSpawnable`] for in-process features.
    /// - [`RegistryError::EntryNotFound`] if the configured script is missing.
    /// - [`RegistryError::SpawnFailed`] if the OS refuses to start the program.
    pub fn start(&mut self, key: FeatureKey) -> Result<u32, RegistryError> {
        if let Some(handle) = self.handles.get_mut(&key) {
            if handle.is_alive() {
                info!(feature = %key, pid = handle.pid(), "already running");
                return Ok(handle.pid());
            }
            self.handles.remove(&key);
        }

        let spec = self
            .features
            .get(key)
            .ok_or(RegistryError::NotSpawnable { key })?;

        let mut cmd = tokio::process::Command::new(&spec.program);
        if let Some(script) = &spec.script {
            if !script.exists() {
                return Err(RegistryError::EntryNotFound {
                    key,
                    path: script.clone(),
                });
            }
            cmd.arg(script);
        }
        let child = cmd
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| RegistryError::SpawnFailed { key, source })?;

        let handle = ProcessHandle::new(key, child).ok_or_else(|| RegistryError::SpawnFailed {
            key,
            source: std::io::Error::other("process exited before its PID was read"),
        })?;
        let pid = handle.pid();
        info!(feature = %key, pid, program = %spec.program, "feature started");
        self.handles.insert(key, handle);
        Ok(pid)
    }

    /// Suspends until the process for `key` exits, then forgets it.
    ///
    /// Returns `Ok(None)` if nothing is tracked for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Wait`] if waiting fails; the entry is dropped
    /// in that case too.
    pub async fn wait_for_exit(
        &mut self,
        key: FeatureKey,
    ) -> Result<Option<ExitStatus>, RegistryError> {
        let Some(handle) = self.handles.get_mut(&key) else {
            return Ok(None);
        };
        let result = handle.wait().await;
        self.handles.remove(&key);
        let status = result?;
        info!(feature = %key, %status, "feature exited");
        Ok(Some(status))
    }

    /// Stops `key`: graceful request, grace period, then force-kill.
    ///
    /// The entry is removed before termination starts, so it is gone whatever
    /// the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TerminationFailed`] if the process could not be
    /// killed.
    pub async fn stop(&mut self, key: FeatureKey) -> Result<StopOutcome, RegistryError> {
        let Some(mut handle) = self.handles.remove(&key) else {
            return Ok(StopOutcome::NotTracked);
        };
        let pid = handle.pid();
        let termination = handle.terminate(self.grace).await?;
        info!(feature = %key, pid, ?termination, "feature stopped");
        Ok(StopOutcome::Stopped(termination))
    }

    /// Liveness probe for `key`.
    pub fn status(&mut self, key: FeatureKey) -> FeatureStatus {
        if self
            .handles
            .get_mut(&key)
            .is_some_and(ProcessHandle::is_alive)
        {
            FeatureStatus::Running
        } else {
            FeatureStatus::Stopped
        }
    }

    /// Stops every tracked feature. Failures are logged and skipped.
    pub async fn stop_all(&mut self) {
        for key in self.tracked_keys() {
            if let Err(e) = self.stop(key).await {
                warn!(feature = %key, error = %e, "stop during shutdown failed");
            }
        }
    }

    /// Keys with a tracked handle (alive or not), in a stable order.
    pub fn tracked_keys(&self) -> Vec<FeatureKey> {
        let mut keys: Vec<_> = self.handles.keys().copied().collect();
        keys.sort();
        keys
    }
}
