//! Speech I/O seams.
//!
//! The controller never touches audio. It talks to a [`SpeechIo`] adapter
//! that can say a line and hand back one recognized utterance, plus an
//! optional [`WakeDetector`] capability for backends with a dedicated
//! keyword spotter.

pub mod command;
pub mod console;

use crate::config::{SpeechBackend, SpeechConfig};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub use command::{CommandSpeech, CommandWakeDetector};
pub use console::ConsoleSpeech;

/// Speech transport contract.
#[async_trait]
pub trait SpeechIo: Send + Sync {
    /// Say `text`. Returns once the utterance has been delivered.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Capture one utterance.
    ///
    /// Returns `Ok(None)` on timeout or unrecognized audio. Errors are
    /// reserved for transport failures; [`ControlError::AdapterUnavailable`]
    /// means the transport is gone for good.
    ///
    /// [`ControlError::AdapterUnavailable`]: crate::error::ControlError::AdapterUnavailable
    async fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<String>>;

    /// Dedicated wake detector, if this backend provides one.
    ///
    /// Called once at startup.
    fn wake_detector(&self) -> Option<Box<dyn WakeDetector>> {
        None
    }
}

/// Blocking keyword spotter.
#[async_trait]
pub trait WakeDetector: Send + Sync {
    /// Blocks until the wake phrase is heard.
    async fn listen(&self) -> Result<()>;
}

/// Builds the speech adapter selected by `config`.
///
/// # Errors
///
/// Returns [`ControlError::AdapterUnavailable`] if the selected backend cannot
/// be constructed.
///
/// [`ControlError::AdapterUnavailable`]: crate::error::ControlError::AdapterUnavailable
pub fn from_config(config: &SpeechConfig) -> Result<Box<dyn SpeechIo>> {
    match config.backend {
        SpeechBackend::Console => Ok(Box::new(ConsoleSpeech::stdio())),
        SpeechBackend::Command => Ok(Box::new(CommandSpeech::from_config(config)?)),
    }
}
