//! Error types for the controller.

use crate::registry::RegistryError;

/// Top-level error type for the voice control plane.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// A required collaborator (speech adapter, chat engine) is missing.
    #[error("adapter unavailable: {0}")]
    AdapterUnavailable(String),

    /// Transient failure while polling for the wake phrase.
    #[error("wake listen error: {0}")]
    WakeListen(String),

    /// Speech input/output error.
    #[error("speech error: {0}")]
    Speech(String),

    /// The conversational session failed.
    #[error("chat engine error: {0}")]
    ChatEngine(String),

    /// Process registry error (spawn or termination).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ControlError>;
