//! Speech adapter backed by external programs.
//!
//! Text-to-speech runs `speak_command` with the text appended as the final
//! argument. Recognition runs `listen_command` once per utterance and reads the
//! transcript from its stdout; the timeout and phrase limit are exposed to the
//! recognizer through `WAKECTL_LISTEN_TIMEOUT` / `WAKECTL_PHRASE_LIMIT`
//! (seconds). A recognizer that overruns both is killed.

use super::{SpeechIo, WakeDetector};
use crate::config::SpeechConfig;
use crate::error::{ControlError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable carrying the listen timeout in seconds.
pub const LISTEN_TIMEOUT_ENV: &str = "WAKECTL_LISTEN_TIMEOUT";
/// Environment variable carrying the phrase limit in seconds.
pub const PHRASE_LIMIT_ENV: &str = "WAKECTL_PHRASE_LIMIT";

/// Speech adapter that shells out to TTS / STT programs.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    speak_argv: Vec<String>,
    listen_argv: Vec<String>,
    wake_argv: Vec<String>,
}

impl CommandSpeech {
    /// Builds the adapter from argv lists.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::AdapterUnavailable`] if either argv is empty.
    pub fn new(speak_argv: Vec<String>, listen_argv: Vec<String>) -> Result<Self> {
        if speak_argv.is_empty() || listen_argv.is_empty() {
            return Err(ControlError::AdapterUnavailable(
                "command speech backend needs both speak and listen commands".to_owned(),
            ));
        }
        Ok(Self {
            speak_argv,
            listen_argv,
            wake_argv: Vec::new(),
        })
    }

    /// Attaches a dedicated wake detector program.
    #[must_use]
    pub fn with_wake_command(mut self, wake_argv: Vec<String>) -> Self {
        self.wake_argv = wake_argv;
        self
    }

    /// Builds the adapter from the `[speech]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::AdapterUnavailable`] if a command is missing.
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        Ok(Self::new(config.speak_command.clone(), config.listen_command.clone())?
            .with_wake_command(config.wake_command.clone()))
    }
}

/// Builds a `tokio` command from a non-empty argv.
fn command_from_argv(argv: &[String]) -> Option<Command> {
    let (program, args) = argv.split_first()?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    Some(cmd)
}

#[async_trait]
impl SpeechIo for CommandSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        let Some(mut cmd) = command_from_argv(&self.speak_argv) else {
            return Err(ControlError::AdapterUnavailable("no speak command".to_owned()));
        };
        let status = cmd
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .await
            .map_err(|e| ControlError::Speech(format!("cannot run speak command: {e}")))?;
        if !status.success() {
            return Err(ControlError::Speech(format!(
                "speak command exited with {status}"
            )));
        }
        Ok(())
    }

    async fn listen(&self, timeout: Duration, phrase_limit: Duration) -> Result<Option<String>> {
        let Some(mut cmd) = command_from_argv(&self.listen_argv) else {
            return Err(ControlError::AdapterUnavailable("no listen command".to_owned()));
        };
        let child = cmd
            .env(LISTEN_TIMEOUT_ENV, timeout.as_secs().to_string())
            .env(PHRASE_LIMIT_ENV, phrase_limit.as_secs().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ControlError::Speech(format!("cannot run listen command: {e}")))?;

        // Dropping the pending future on expiry kills the recognizer.
        let output = match tokio::time::timeout(timeout + phrase_limit, child.wait_with_output())
            .await
        {
            Ok(result) => result
                .map_err(|e| ControlError::Speech(format!("listen command failed: {e}")))?,
            Err(_) => {
                debug!("listen command overran its window");
                return Ok(None);
            }
        };

        if !output.status.success() {
            debug!(status = %output.status, "listen command recognized nothing");
            return Ok(None);
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        Ok((!text.is_empty()).then_some(text))
    }

    fn wake_detector(&self) -> Option<Box<dyn WakeDetector>> {
        let program = self.wake_argv.first()?;
        if let Err(e) = which::which(program) {
            warn!(program = %program, error = %e, "wake detector not found, falling back to polling");
            return None;
        }
        Some(Box::new(CommandWakeDetector {
            argv: self.wake_argv.clone(),
        }))
    }
}

/// Wake detector that runs a blocking keyword-spotter program.
#[derive(Debug, Clone)]
pub struct CommandWakeDetector {
    argv: Vec<String>,
}

impl CommandWakeDetector {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl WakeDetector for CommandWakeDetector {
    async fn listen(&self) -> Result<()> {
        let Some(mut cmd) = command_from_argv(&self.argv) else {
            return Err(ControlError::AdapterUnavailable("no wake command".to_owned()));
        };
        let status = cmd
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| ControlError::WakeListen(format!("cannot run wake command: {e}")))?;
        if status.success() {
            Ok(())
        } else {
            Err(ControlError::WakeListen(format!(
                "wake command exited with {status}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_owned(), "-c".to_owned(), script.to_owned()]
    }

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn empty_commands_are_unavailable() {
        let err = CommandSpeech::new(Vec::new(), sh("true")).unwrap_err();
        assert!(matches!(err, ControlError::AdapterUnavailable(_)));
    }

    #[tokio::test]
    async fn listen_reads_stdout() {
        let speech = CommandSpeech::new(sh("true"), sh("echo '  Jarvis  '")).unwrap();
        let heard = speech.listen(SECOND, SECOND).await.unwrap();
        assert_eq!(heard.as_deref(), Some("Jarvis"));
    }

    #[tokio::test]
    async fn listen_exposes_window_in_env() {
        let speech = CommandSpeech::new(
            sh("true"),
            sh("echo \"$WAKECTL_LISTEN_TIMEOUT/$WAKECTL_PHRASE_LIMIT\""),
        )
        .unwrap();
        let heard = speech
            .listen(Duration::from_secs(4), Duration::from_secs(6))
            .await
            .unwrap();
        assert_eq!(heard.as_deref(), Some("4/6"));
    }

    #[tokio::test]
    async fn listen_failure_exit_is_no_utterance() {
        let speech = CommandSpeech::new(sh("true"), sh("echo noise; exit 3")).unwrap();
        assert_eq!(speech.listen(SECOND, SECOND).await.unwrap(), None);
    }

    #[tokio::test]
    async fn listen_empty_output_is_no_utterance() {
        let speech = CommandSpeech::new(sh("true"), sh("true")).unwrap();
        assert_eq!(speech.listen(SECOND, SECOND).await.unwrap(), None);
    }

    #[tokio::test]
    async fn listen_overrun_is_no_utterance() {
        let speech = CommandSpeech::new(sh("true"), sh("sleep 5; echo late")).unwrap();
        let heard = speech
            .listen(Duration::from_millis(50), Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(heard, None);
    }

    #[tokio::test]
    async fn listen_missing_program_is_speech_error() {
        let speech = CommandSpeech::new(
            sh("true"),
            vec!["/nonexistent/wakectl-stt".to_owned()],
        )
        .unwrap();
        let err = speech.listen(SECOND, SECOND).await.unwrap_err();
        assert!(matches!(err, ControlError::Speech(_)));
    }

    #[tokio::test]
    async fn speak_appends_text_argument() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("spoken.txt");
        let script = format!("printf '%s' \"$1\" > {}", out.display());
        let speak = vec![
            "sh".to_owned(),
            "-c".to_owned(),
            script,
            "speak".to_owned(),
        ];
        let speech = CommandSpeech::new(speak, sh("true")).unwrap();
        speech.speak("Controller ready.").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "Controller ready.");
    }

    #[tokio::test]
    async fn speak_failure_is_reported() {
        let speech = CommandSpeech::new(sh("exit 1"), sh("true")).unwrap();
        assert!(speech.speak("hello").await.is_err());
    }

    #[test]
    fn no_wake_command_means_no_detector() {
        let speech = CommandSpeech::new(sh("true"), sh("true")).unwrap();
        assert!(speech.wake_detector().is_none());
    }

    #[test]
    fn missing_wake_program_falls_back_to_polling() {
        let speech = CommandSpeech::new(sh("true"), sh("true"))
            .unwrap()
            .with_wake_command(vec!["/nonexistent/wakectl-spotter".to_owned()]);
        assert!(speech.wake_detector().is_none());
    }

    #[test]
    fn available_wake_program_yields_detector() {
        let speech = CommandSpeech::new(sh("true"), sh("true"))
            .unwrap()
            .with_wake_command(sh("exit 0"));
        assert!(speech.wake_detector().is_some());
    }

    #[tokio::test]
    async fn wake_detector_maps_exit_status() {
        assert!(CommandWakeDetector::new(sh("exit 0")).listen().await.is_ok());
        let err = CommandWakeDetector::new(sh("exit 1")).listen().await.unwrap_err();
        assert!(matches!(err, ControlError::WakeListen(_)));
    }
}
