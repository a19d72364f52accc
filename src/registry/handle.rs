//! Owned handle to one running feature process.

use super::error::RegistryError;
use crate::feature::FeatureKey;
use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Child;
use tracing::{debug, warn};

/// How a termination sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process had already exited before anything was sent.
    AlreadyExited,
    /// The process exited within the grace period after the graceful request.
    Graceful,
    /// The process had to be force-killed.
    Killed,
}

/// A live child process for one feature key.
///
/// Dropping the handle force-kills the child if it is still running.
pub struct ProcessHandle {
    key: FeatureKey,
    pid: u32,
    child: Child,
}

impl ProcessHandle {
    /// Wraps a freshly spawned child.
    ///
    /// Returns `None` if the child already exited and has no PID.
    pub fn new(key: FeatureKey, child: Child) -> Option<Self> {
        let pid = child.id()?;
        Some(Self { key, pid, child })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking liveness probe.
    pub fn is_alive(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(_)) => false,
            Ok(None) => true,
            Err(e) => {
                debug!(feature = %self.key, pid = self.pid, error = %e, "liveness probe failed");
                false
            }
        }
    }

    /// Waits for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Wait`] if the OS wait fails.
    pub async fn wait(&mut self) -> Result<ExitStatus, RegistryError> {
        self.child.wait().await.map_err(|source| RegistryError::Wait {
            key: self.key,
            source,
        })
    }

    /// Requests graceful termination, then force-kills after `grace`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::TerminationFailed`] if the process could not be
    /// killed.
    pub async fn terminate(&mut self, grace: Duration) -> Result<Termination, RegistryError> {
        if !self.is_alive() {
            return Ok(Termination::AlreadyExited);
        }

        if self.request_graceful_exit() {
            match tokio::time::timeout(grace, self.child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(feature = %self.key, pid = self.pid, %status, "exited after graceful request");
                    return Ok(Termination::Graceful);
                }
                Ok(Err(e)) => {
                    warn!(feature = %self.key, pid = self.pid, error = %e, "wait after graceful request failed");
                }
                Err(_) => {
                    debug!(feature = %self.key, pid = self.pid, "grace period elapsed, killing");
                }
            }
        }

        self.child
            .kill()
            .await
            .map_err(|e| RegistryError::TerminationFailed {
                key: self.key,
                reason: e.to_string(),
            })?;
        Ok(Termination::Killed)
    }

    #[cfg(unix)]
    fn request_graceful_exit(&self) -> bool {
        let Ok(pid) = libc::pid_t::try_from(self.pid) else {
            return false;
        };
        // SAFETY: plain signal delivery to a child we spawned and have not reaped.
        let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
        if rc != 0 {
            warn!(
                feature = %self.key,
                pid = self.pid,
                error = %std::io::Error::last_os_error(),
                "SIGTERM failed"
            );
        }
        rc == 0
    }

    #[cfg(not(unix))]
    fn request_graceful_exit(&self) -> bool {
        false
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.start_kill();
            debug!(feature = %self.key, pid = self.pid, "killed feature process on drop");
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("key", &self.key)
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::process::Stdio;

    fn spawn(program: &str, args: &[&str]) -> Child {
        tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn child")
    }

    #[tokio::test]
    async fn live_child_is_alive() {
        let mut handle = ProcessHandle::new(FeatureKey::Face, spawn("sleep", &["30"])).unwrap();
        assert!(handle.is_alive());
        handle.terminate(Duration::from_secs(2)).await.unwrap();
        assert!(!handle.is_alive());
    }

    #[tokio::test]
    async fn exited_child_is_not_alive() {
        let mut handle = ProcessHandle::new(FeatureKey::Hand, spawn("true", &[])).unwrap();
        handle.wait().await.unwrap();
        assert!(!handle.is_alive());
        assert_eq!(
            handle.terminate(Duration::from_secs(1)).await.unwrap(),
            Termination::AlreadyExited
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_is_graceful() {
        let mut handle = ProcessHandle::new(FeatureKey::Face, spawn("sleep", &["30"])).unwrap();
        let outcome = handle.terminate(Duration::from_secs(2)).await.unwrap();
        assert_eq!(outcome, Termination::Graceful);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ignored_sigterm_is_force_killed() {
        let child = spawn("sh", &["-c", "trap '' TERM; while :; do sleep 1; done"]);
        let mut handle = ProcessHandle::new(FeatureKey::Hand, child).unwrap();
        // Let the shell install its trap before signalling.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let outcome = handle.terminate(Duration::from_millis(200)).await.unwrap();
        assert_eq!(outcome, Termination::Killed);
        assert!(!handle.is_alive());
    }

    #[test]
    fn handle_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ProcessHandle>();
    }
}
