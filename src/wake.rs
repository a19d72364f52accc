//! Wake phrase gating.
//!
//! The gate either delegates to a dedicated [`WakeDetector`] or polls the
//! speech adapter's listen primitive and matches the phrase itself. Matching
//! is strict: the utterance must be the phrase, or begin with the phrase
//! followed by a space. Mentioning the phrase mid-sentence does not wake the
//! controller.

use crate::config::WakeConfig;
use crate::error::{ControlError, Result};
use crate::speech::{SpeechIo, WakeDetector};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Returns `true` if `text` opens with the wake `phrase`.
///
/// Both sides are trimmed and compared case-insensitively.
pub fn matches_wake_phrase(text: &str, phrase: &str) -> bool {
    let text = text.trim().to_lowercase();
    let phrase = phrase.trim().to_lowercase();
    if phrase.is_empty() {
        return false;
    }
    match text.strip_prefix(&phrase) {
        Some(rest) => rest.is_empty() || rest.starts_with(' '),
        None => false,
    }
}

/// Blocks the controller until the wake phrase is heard.
pub struct WakeGate {
    phrase: String,
    detector: Option<Box<dyn WakeDetector>>,
    poll_timeout: Duration,
    poll_phrase_limit: Duration,
    retry_delay: Duration,
    max_attempts: Option<u32>,
}

impl WakeGate {
    /// Builds a polling gate from config.
    pub fn new(config: &WakeConfig) -> Self {
        Self {
            phrase: config.phrase.trim().to_lowercase(),
            detector: None,
            poll_timeout: config.poll_timeout(),
            poll_phrase_limit: config.poll_phrase_limit(),
            retry_delay: config.retry_delay(),
            max_attempts: config.max_attempts,
        }
    }

    /// Delegates to `detector` instead of polling.
    #[must_use]
    pub fn with_detector(mut self, detector: Box<dyn WakeDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn has_detector(&self) -> bool {
        self.detector.is_some()
    }

    /// Waits for the wake phrase.
    ///
    /// Returns `Ok(false)` when the detector fails or the attempt budget runs
    /// out. Transient listen failures are logged and retried.
    ///
    /// # Errors
    ///
    /// Only [`ControlError::AdapterUnavailable`] is returned, meaning the
    /// speech transport is gone and waiting further is pointless.
    pub async fn await_wake(&self, speech: &dyn SpeechIo) -> Result<bool> {
        if let Some(detector) = &self.detector {
            return match detector.listen().await {
                Ok(()) => {
                    info!("wake detector triggered");
                    Ok(true)
                }
                Err(e @ ControlError::AdapterUnavailable(_)) => Err(e),
                Err(e) => {
                    warn!(error = %e, "wake detector failed");
                    Ok(false)
                }
            };
        }

        let mut attempts: u32 = 0;
        loop {
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                debug!(attempts, "wake attempt budget exhausted");
                return Ok(false);
            }
            attempts = attempts.saturating_add(1);

            match speech.listen(self.poll_timeout, self.poll_phrase_limit).await {
                Ok(Some(text)) if matches_wake_phrase(&text, &self.phrase) => {
                    info!(heard = %text, "wake phrase detected");
                    return Ok(true);
                }
                Ok(Some(text)) => debug!(heard = %text, "not the wake phrase"),
                Ok(None) => {}
                Err(e @ ControlError::AdapterUnavailable(_)) => return Err(e),
                Err(e) => warn!(error = %e, "wake listen failed"),
            }

            tokio::time::sleep(self.retry_delay).await;
        }
    }
}
