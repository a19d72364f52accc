//! Configuration types for the voice controller.

use crate::error::{ControlError, Result};
use crate::feature::FeatureKey;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the configured wake phrase.
pub const WAKEWORD_ENV: &str = "WAKEWORD";

/// Top-level configuration for the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Wake phrase gating.
    pub wake: WakeConfig,
    /// Post-wake command capture.
    pub command: CommandConfig,
    /// Child process termination settings.
    pub process: ProcessConfig,
    /// Entry points for the process-backed features.
    pub features: FeaturesConfig,
    /// Speech transport selection.
    pub speech: SpeechConfig,
    /// Optional conversational session.
    pub chat: ChatConfig,
    /// Log sinks.
    pub logging: LoggingConfig,
}

/// Wake phrase configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Phrase that must open an utterance to wake the controller
    /// (case-insensitive).
    pub phrase: String,
    /// Listen timeout for each polling attempt, in seconds.
    pub poll_timeout_secs: u64,
    /// Maximum phrase length for each polling attempt, in seconds.
    pub poll_phrase_limit_secs: u64,
    /// Pause between polling attempts, in milliseconds.
    pub retry_delay_ms: u64,
    /// Give up after this many polling attempts. `None` polls forever.
    pub max_attempts: Option<u32>,
    /// Use the speech backend's dedicated wake detector when it offers one.
    pub use_detector: bool,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrase: "jarvis".to_owned(),
            poll_timeout_secs: 2,
            poll_phrase_limit_secs: 2,
            retry_delay_ms: 150,
            max_attempts: None,
            use_detector: true,
        }
    }
}

impl WakeConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn poll_phrase_limit(&self) -> Duration {
        Duration::from_secs(self.poll_phrase_limit_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Single-utterance command capture after the wake phrase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Seconds to wait for the operator to start speaking.
    pub timeout_secs: u64,
    /// Maximum command length in seconds.
    pub phrase_limit_secs: u64,
    /// Prompt spoken right after the wake phrase is heard.
    pub acknowledgement: String,
    /// Phrases that shut the controller down (substring match).
    pub exit_phrases: Vec<String>,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 4,
            phrase_limit_secs: 6,
            acknowledgement: "Yes?".to_owned(),
            exit_phrases: vec![
                "exit controller".to_owned(),
                "shutdown controller".to_owned(),
                "quit controller".to_owned(),
                "stop controller".to_owned(),
            ],
        }
    }
}

impl CommandConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn phrase_limit(&self) -> Duration {
        Duration::from_secs(self.phrase_limit_secs)
    }
}

/// Child process termination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// How long a child gets to exit after the graceful request before it is
    /// force-killed, in milliseconds.
    pub grace_period_ms: u64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 2_000,
        }
    }
}

impl ProcessConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

/// Fixed, argument-free entry point of a feature workload.
///
/// The child is launched as `program [script]` in the controller's working
/// directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Executable to launch (looked up on `PATH` when not absolute).
    pub program: String,
    /// Script passed as the only argument. Must exist when set.
    #[serde(default)]
    pub script: Option<PathBuf>,
}

impl FeatureSpec {
    pub fn new(program: impl Into<String>, script: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script,
        }
    }
}

/// Entry points for every process-backed feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub face: FeatureSpec,
    pub hand: FeatureSpec,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            face: FeatureSpec::new("python3", Some(PathBuf::from("facerecognition.py"))),
            hand: FeatureSpec::new("python3", Some(PathBuf::from("objectdetection.py"))),
        }
    }
}

impl FeaturesConfig {
    /// Returns the entry point for `key`, or `None` for in-process features.
    pub fn get(&self, key: FeatureKey) -> Option<&FeatureSpec> {
        match key {
            FeatureKey::Face => Some(&self.face),
            FeatureKey::Hand => Some(&self.hand),
            FeatureKey::Chatbot => None,
        }
    }
}

/// Which speech transport to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechBackend {
    /// Type commands on stdin, read replies on stdout.
    #[default]
    Console,
    /// External text-to-speech and speech-to-text programs.
    Command,
}

/// Speech transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,
    /// Command backend: argv for speaking; the text is appended as the last
    /// argument (e.g. `["espeak"]`).
    pub speak_command: Vec<String>,
    /// Command backend: argv for one recognition pass; the transcript is read
    /// from stdout.
    pub listen_command: Vec<String>,
    /// Optional dedicated wake detector: argv of a program that blocks until
    /// the wake phrase is heard and exits with status 0. Empty = poll
    /// `listen_command` instead.
    pub wake_command: Vec<String>,
}

/// Conversational session configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// argv of the interactive chat session. `None` disables the assistant.
    pub command: Option<Vec<String>>,
}

/// Log sinks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write a daily-rolling log file.
    pub file: bool,
    /// Directory for log files (default: the application logs directory).
    pub directory: Option<PathBuf>,
}

impl LoggingConfig {
    pub fn effective_directory(&self) -> PathBuf {
        self.directory
            .clone()
            .unwrap_or_else(crate::app_dirs::logs_dir)
    }
}

impl ControlConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ControlError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ControlError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/wakectl/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::app_dirs::config_dir().join("config.toml")
    }

    /// Applies environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies environment overrides using `lookup` to read variables.
    pub fn apply_env_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(phrase) = lookup(WAKEWORD_ENV) {
            let phrase = phrase.trim().to_lowercase();
            if !phrase.is_empty() {
                self.wake.phrase = phrase;
            }
        }
    }

    /// Checks invariants that serde defaults cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.wake.phrase.trim().is_empty() {
            return Err(ControlError::Config("wake phrase must not be empty".into()));
        }
        if self.wake.max_attempts == Some(0) {
            return Err(ControlError::Config(
                "wake.max_attempts must be at least 1 when set".into(),
            ));
        }
        for key in FeatureKey::SPAWNABLE {
            if let Some(spec) = self.features.get(key)
                && spec.program.trim().is_empty()
            {
                return Err(ControlError::Config(format!(
                    "features.{key}.program must not be empty"
                )));
            }
        }
        if self.speech.backend == SpeechBackend::Command {
            if self.speech.speak_command.is_empty() {
                return Err(ControlError::Config(
                    "speech.speak_command is required for the command backend".into(),
                ));
            }
            if self.speech.listen_command.is_empty() {
                return Err(ControlError::Config(
                    "speech.listen_command is required for the command backend".into(),
                ));
            }
        }
        if let Some(argv) = &self.chat.command
            && argv.is_empty()
        {
            return Err(ControlError::Config(
                "chat.command must name a program when set".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ControlConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.wake.phrase, "jarvis");
        assert_eq!(config.wake.max_attempts, None);
        assert_eq!(config.process.grace_period(), Duration::from_secs(2));
        assert_eq!(config.command.timeout(), Duration::from_secs(4));
        assert_eq!(config.command.phrase_limit(), Duration::from_secs(6));
        assert_eq!(config.command.exit_phrases.len(), 4);
        assert!(config.chat.command.is_none());
        assert_eq!(config.speech.backend, SpeechBackend::Console);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ControlConfig::default();
        config.wake.phrase = "computer".to_owned();
        config.wake.max_attempts = Some(3);
        config.features.hand = FeatureSpec::new("/usr/bin/env", None);
        config.chat.command = Some(vec!["ollama".into(), "run".into(), "llama3.2".into()]);

        config.save_to_file(&path).unwrap();
        let loaded = ControlConfig::from_file(&path).unwrap();

        assert_eq!(loaded.wake.phrase, "computer");
        assert_eq!(loaded.wake.max_attempts, Some(3));
        assert_eq!(loaded.features.hand, FeatureSpec::new("/usr/bin/env", None));
        assert_eq!(loaded.chat.command.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = ControlConfig::from_file(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ControlError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();

        let result = ControlConfig::from_file(&path);
        assert!(matches!(result, Err(ControlError::Config(_))));
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml_str = r#"
[wake]
phrase = "friday"

[features.face]
program = "./face-tracker"
"#;
        let config: ControlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.wake.phrase, "friday");
        assert_eq!(config.wake.retry_delay_ms, 150);
        assert_eq!(config.features.face.program, "./face-tracker");
        assert!(config.features.face.script.is_none());
        assert_eq!(config.features.hand, FeaturesConfig::default().hand);
    }

    #[test]
    fn speech_backend_deserializes() {
        let config: ControlConfig = toml::from_str(
            r#"
[speech]
backend = "command"
speak_command = ["espeak"]
listen_command = ["my-stt", "--once"]
"#,
        )
        .unwrap();
        assert_eq!(config.speech.backend, SpeechBackend::Command);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn command_backend_requires_commands() {
        let mut config = ControlConfig::default();
        config.speech.backend = SpeechBackend::Command;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_wake_phrase_is_rejected() {
        let mut config = ControlConfig::default();
        config.wake.phrase = "   ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_attempt_budget_is_rejected() {
        let mut config = ControlConfig::default();
        config.wake.max_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_chat_command_is_rejected() {
        let mut config = ControlConfig::default();
        config.chat.command = Some(Vec::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn wakeword_env_override_is_lowercased() {
        let mut config = ControlConfig::default();
        config.apply_env_overrides_from(|key| {
            (key == WAKEWORD_ENV).then(|| "  Computer ".to_owned())
        });
        assert_eq!(config.wake.phrase, "computer");
    }

    #[test]
    fn blank_wakeword_env_is_ignored() {
        let mut config = ControlConfig::default();
        config.apply_env_overrides_from(|_| Some("   ".to_owned()));
        assert_eq!(config.wake.phrase, "jarvis");
    }

    #[test]
    fn features_lookup_excludes_chatbot() {
        let features = FeaturesConfig::default();
        assert!(features.get(FeatureKey::Chatbot).is_none());
        assert!(features.get(FeatureKey::Face).is_some());
        assert!(features.get(FeatureKey::Hand).is_some());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = ControlConfig::default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
