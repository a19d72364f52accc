//! The controller loop.
//!
//! One task serializes everything: wait for the wake phrase, capture one
//! command, dispatch it, and block until the dispatched work finishes before
//! listening again. Shutdown (exit phrase, closed speech transport, or
//! operator interrupt) always stops every tracked feature.

use crate::chat::ChatEngine;
use crate::config::ControlConfig;
use crate::error::{ControlError, Result};
use crate::feature::FeatureKey;
use crate::interpreter::{Action, Command, classify};
use crate::registry::{ProcessRegistry, StopOutcome};
use crate::runtime::{ControllerEvent, EventSender};
use crate::speech::SpeechIo;
use crate::wake::WakeGate;
use std::fmt;
use std::future::Future;
use tracing::{debug, error, info, warn};

const UNRECOGNIZED: &str =
    "I only listen for start or stop commands for chatbot, face, or hand.";
const CHAT_UNAVAILABLE: &str = "Assistant is not available on this controller.";
const CHAT_STARTING: &str = "Starting assistant.";
const CHAT_CRASHED: &str = "Assistant crashed. Returning to controller.";
const CHAT_RETURNED: &str = "Returned to controller. Say the wake word to give another command.";
const CHAT_STOP_HINT: &str = "If the assistant is running, say bye to it.";
const FAREWELL: &str = "Controller shutting down. Goodbye.";

/// Where the controller loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Waiting for the wake phrase.
    IdleListening,
    /// Woken; capturing one command.
    AwaitingCommand,
    /// Acting on a classified command.
    Dispatching,
    /// Suspended until a started feature process exits.
    BlockedOnChild,
    /// Stopping every feature before exit.
    ShuttingDown,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::IdleListening => "idle-listening",
            Self::AwaitingCommand => "awaiting-command",
            Self::Dispatching => "dispatching",
            Self::BlockedOnChild => "blocked-on-child",
            Self::ShuttingDown => "shutting-down",
        };
        f.write_str(label)
    }
}

/// Why the serving loop ended.
enum Exit {
    ExitPhrase,
    TransportClosed(ControlError),
}

/// Voice-gated controller owning the registry and its collaborators.
pub struct Controller {
    config: ControlConfig,
    speech: Box<dyn SpeechIo>,
    chat: Option<Box<dyn ChatEngine>>,
    gate: WakeGate,
    registry: ProcessRegistry,
    state: ControllerState,
    events: Option<EventSender>,
}

impl Controller {
    /// Builds a controller.
    ///
    /// The wake detector, when enabled in config, is requested from the
    /// speech adapter here and never again.
    pub fn new(
        config: ControlConfig,
        speech: Box<dyn SpeechIo>,
        chat: Option<Box<dyn ChatEngine>>,
    ) -> Self {
        let mut gate = WakeGate::new(&config.wake);
        if config.wake.use_detector
            && let Some(detector) = speech.wake_detector()
        {
            gate = gate.with_detector(detector);
        }
        info!(
            phrase = gate.phrase(),
            detector = gate.has_detector(),
            "wake gate ready"
        );
        if chat.is_none() {
            info!("assistant disabled");
        }
        let registry =
            ProcessRegistry::new(config.features.clone(), config.process.grace_period());
        Self {
            config,
            speech,
            chat,
            gate,
            registry,
            state: ControllerState::IdleListening,
            events: None,
        }
    }

    /// Sends [`ControllerEvent`]s to `events` while running.
    #[must_use]
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Runs until an exit phrase, a closed speech transport, or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the speech adapter went away.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(interrupt()).await
    }

    /// Runs until an exit phrase, a closed speech transport, or `shutdown`
    /// resolves. Every tracked feature is stopped on the way out.
    ///
    /// # Errors
    ///
    /// Returns the transport error if the speech adapter went away.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let greeting = format!(
            "Controller ready. Say the wake word '{}' and then say start or stop followed by chatbot, face, or hand.",
            self.gate.phrase()
        );
        self.say(&greeting).await;

        let outcome = tokio::select! {
            exit = self.serve() => match exit {
                Exit::ExitPhrase => Ok(()),
                Exit::TransportClosed(e) => {
                    warn!(error = %e, "speech transport closed");
                    Err(e)
                }
            },
            () = shutdown => {
                info!("controller interrupted by operator");
                Ok(())
            }
        };

        self.shutdown().await;
        outcome
    }

    async fn serve(&mut self) -> Exit {
        loop {
            self.transition(ControllerState::IdleListening);
            match self.gate.await_wake(self.speech.as_ref()).await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::time::sleep(self.config.wake.retry_delay()).await;
                    continue;
                }
                Err(e) => return Exit::TransportClosed(e),
            }

            self.transition(ControllerState::AwaitingCommand);
            let acknowledgement = self.config.command.acknowledgement.clone();
            self.say(&acknowledgement).await;

            // Silence after the prompt returns to wake listening without a word.
            let heard = match self
                .speech
                .listen(
                    self.config.command.timeout(),
                    self.config.command.phrase_limit(),
                )
                .await
            {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!("no command heard");
                    continue;
                }
                Err(e @ ControlError::AdapterUnavailable(_)) => return Exit::TransportClosed(e),
                Err(e) => {
                    warn!(error = %e, "command listen failed");
                    continue;
                }
            };
            info!(heard = %heard, "heard command");

            if self.is_exit_phrase(&heard) {
                return Exit::ExitPhrase;
            }

            let command = classify(&heard);
            self.transition(ControllerState::Dispatching);
            self.dispatch(command).await;
        }
    }

    fn is_exit_phrase(&self, heard: &str) -> bool {
        let heard = heard.trim().to_lowercase();
        self.config
            .command
            .exit_phrases
            .iter()
            .any(|phrase| heard.contains(&phrase.to_lowercase()))
    }

    async fn dispatch(&mut self, command: Command) {
        info!(%command, "dispatching");
        self.emit(ControllerEvent::Dispatched(command.clone()));

        if !command.is_actionable() {
            self.say(UNRECOGNIZED).await;
            return;
        }
        match (command.action, command.target) {
            (Action::Start, Some(key)) if key.is_in_process() => self.run_chat().await,
            (Action::Start, Some(key)) => self.start_and_wait(key).await,
            (Action::Stop, Some(key)) if key.is_in_process() => self.say(CHAT_STOP_HINT).await,
            (Action::Stop, Some(key)) => self.stop_feature(key).await,
            _ => {
                let summary = self.status_summary();
                self.say(&summary).await;
            }
        }
    }

    /// One spoken line covering every process-backed feature.
    fn status_summary(&mut self) -> String {
        let parts: Vec<String> = FeatureKey::SPAWNABLE
            .into_iter()
            .map(|key| format!("{key} is {}", self.registry.status(key)))
            .collect();
        format!("Status: {}", parts.join(". "))
    }

    async fn run_chat(&mut self) {
        let Some(chat) = &self.chat else {
            self.say(CHAT_UNAVAILABLE).await;
            return;
        };
        self.say(CHAT_STARTING).await;
        let result = chat.run().await;
        if let Err(e) = result {
            error!(error = %e, "assistant session failed");
            self.say(CHAT_CRASHED).await;
        }
        self.say(CHAT_RETURNED).await;
    }

    async fn start_and_wait(&mut self, key: FeatureKey) {
        if let Err(e) = self.registry.start(key) {
            error!(feature = %key, error = %e, "feature failed to start");
            self.say(&format!("Couldn't start {key}.")).await;
            return;
        }

        self.say(&format!("Starting {key}. Controller will pause until it stops."))
            .await;
        self.transition(ControllerState::BlockedOnChild);
        match self.registry.wait_for_exit(key).await {
            Ok(status) => {
                let code = status.and_then(|s| s.code());
                self.emit(ControllerEvent::FeatureExited { key, code });
            }
            Err(e) => warn!(feature = %key, error = %e, "waiting for feature failed"),
        }
        self.say(&format!("{key} finished. Controller listening again."))
            .await;
    }

    async fn stop_feature(&mut self, key: FeatureKey) {
        let line = match self.registry.stop(key).await {
            Ok(StopOutcome::Stopped(_)) => format!("Stopped {key}."),
            Ok(StopOutcome::NotTracked) => format!("{key} was not running."),
            Err(e) => {
                // The handle is already gone; only the report differs.
                error!(feature = %key, error = %e, "feature did not terminate cleanly");
                format!("Stopped {key}.")
            }
        };
        self.say(&line).await;
    }

    async fn shutdown(&mut self) {
        self.transition(ControllerState::ShuttingDown);
        self.registry.stop_all().await;
        self.say(FAREWELL).await;
    }

    /// Speaks `text`, falling back to stdout if the adapter fails.
    async fn say(&self, text: &str) {
        info!(text, "speak");
        if let Err(e) = self.speech.speak(text).await {
            warn!(error = %e, "speak failed");
            println!("BOT: {text}");
        }
        self.emit(ControllerEvent::Spoke(text.to_owned()));
    }

    fn transition(&mut self, to: ControllerState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!(%from, %to, "controller state transition");
        self.state = to;
        self.emit(ControllerEvent::StateChanged { from, to });
    }

    fn emit(&self, event: ControllerEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver just means nobody is watching.
            let _ = events.send(event);
        }
    }
}

/// Resolves on Ctrl+C. Never resolves if the signal handler can't be installed.
async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
