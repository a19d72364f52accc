//! Scripted collaborators for driving the controller without audio.
//!
//! Used by unit tests and by the integration tests under `tests/`.

use crate::chat::ChatEngine;
use crate::config::FeatureSpec;
use crate::error::{ControlError, Result};
use crate::speech::SpeechIo;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Speech adapter that replays a fixed list of utterances.
///
/// Each `listen` pops the next entry (`None` = nothing recognized). Once the
/// script runs out, `listen` reports [`ControlError::AdapterUnavailable`],
/// the same way the console adapter reports end of input. Spoken lines are
/// recorded and can be inspected through a [`SpokenLog`].
#[derive(Debug, Default)]
pub struct ScriptedSpeech {
    utterances: Mutex<VecDeque<Option<String>>>,
    listen_failures: AtomicUsize,
    spoken: SpokenLog,
}

impl ScriptedSpeech {
    pub fn new<I, S>(utterances: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            utterances: Mutex::new(
                utterances
                    .into_iter()
                    .map(|u| u.map(Into::into))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// The first `count` listens fail with a transient speech error.
    #[must_use]
    pub fn with_listen_failures(self, count: usize) -> Self {
        self.listen_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Handle to the spoken-line log that outlives the adapter.
    pub fn spoken_log(&self) -> SpokenLog {
        self.spoken.clone()
    }

    /// Utterances not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.utterances).len()
    }
}

#[async_trait]
impl SpeechIo for ScriptedSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        self.spoken.push(text);
        Ok(())
    }

    async fn listen(&self, _timeout: Duration, _phrase_limit: Duration) -> Result<Option<String>> {
        let pending_failures = self.listen_failures.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.listen_failures
                .store(pending_failures - 1, Ordering::SeqCst);
            return Err(ControlError::Speech("scripted listen failure".to_owned()));
        }
        match lock(&self.utterances).pop_front() {
            Some(utterance) => Ok(utterance),
            None => Err(ControlError::AdapterUnavailable(
                "script exhausted".to_owned(),
            )),
        }
    }
}

/// Shared record of every line spoken through a [`ScriptedSpeech`].
#[derive(Debug, Clone, Default)]
pub struct SpokenLog(Arc<Mutex<Vec<String>>>);

impl SpokenLog {
    fn push(&self, text: &str) {
        lock(&self.0).push(text.to_owned());
    }

    /// Snapshot of the lines spoken so far.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.0).clone()
    }

    /// `true` if any spoken line equals `text`.
    pub fn contains(&self, text: &str) -> bool {
        lock(&self.0).iter().any(|line| line == text)
    }
}

/// Chat engine that records how often it ran and optionally fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChat {
    fail: bool,
    runs: Arc<AtomicUsize>,
}

impl ScriptedChat {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of completed `run` calls, shared across clones.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatEngine for ScriptedChat {
    async fn run(&self) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(ControlError::ChatEngine("scripted chat crash".to_owned()))
        } else {
            Ok(())
        }
    }
}

/// Writes a shell script named `name` into `dir` and returns a feature spec
/// that runs it with `sh`.
///
/// # Errors
///
/// Returns an I/O error if the script cannot be written.
pub fn shell_feature(dir: &Path, name: &str, body: &str) -> std::io::Result<FeatureSpec> {
    let path = dir.join(name);
    std::fs::write(&path, body)?;
    Ok(FeatureSpec::new("sh", Some(path)))
}
