//! Conversational assistant seam.
//!
//! The chatbot runs in-process from the controller's point of view: while a
//! session is active the controller waits for it and listens for nothing
//! else. A failing session is reported and the controller carries on.

use crate::config::ChatConfig;
use crate::error::{ControlError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tracing::{debug, info};

/// Interactive conversational session.
#[async_trait]
pub trait ChatEngine: Send + Sync {
    /// Runs one session to completion.
    ///
    /// # Errors
    ///
    /// Any error is treated as a crashed session by the controller.
    async fn run(&self) -> Result<()>;
}

/// Chat session backed by an external interactive program.
///
/// The program inherits the controller's terminal so the operator can talk to
/// it directly; the session ends when the program exits.
#[derive(Debug, Clone)]
pub struct CommandChatEngine {
    argv: Vec<String>,
}

impl CommandChatEngine {
    /// # Errors
    ///
    /// Returns [`ControlError::AdapterUnavailable`] if `argv` is empty or its
    /// program cannot be found.
    pub fn new(argv: Vec<String>) -> Result<Self> {
        let Some(program) = argv.first() else {
            return Err(ControlError::AdapterUnavailable(
                "chat command is empty".to_owned(),
            ));
        };
        which::which(program).map_err(|e| {
            ControlError::AdapterUnavailable(format!("chat program '{program}' not found: {e}"))
        })?;
        Ok(Self { argv })
    }
}

#[async_trait]
impl ChatEngine for CommandChatEngine {
    async fn run(&self) -> Result<()> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err(ControlError::AdapterUnavailable(
                "chat command is empty".to_owned(),
            ));
        };
        info!(program = %program, "chat session starting");
        let status = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| ControlError::ChatEngine(format!("cannot start chat session: {e}")))?;
        debug!(%status, "chat session ended");
        if status.success() {
            Ok(())
        } else {
            Err(ControlError::ChatEngine(format!(
                "chat session exited with {status}"
            )))
        }
    }
}

/// Builds the chat engine from config.
///
/// Returns `Ok(None)` when no chat command is configured.
///
/// # Errors
///
/// Returns [`ControlError::AdapterUnavailable`] if a command is configured but
/// cannot be used.
pub fn from_config(config: &ChatConfig) -> Result<Option<Box<dyn ChatEngine>>> {
    match &config.command {
        None => Ok(None),
        Some(argv) => Ok(Some(Box::new(CommandChatEngine::new(argv.clone())?))),
    }
}
