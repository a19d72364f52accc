//! wakectl: a voice-gated control plane for local feature workloads.
//!
//! A single controller loop waits for a strict wake phrase, captures one
//! spoken command, classifies it against a fixed verb/noun grammar and then
//! starts, stops or reports on the feature workloads it manages:
//!
//! Wake gate → prompt → one utterance → interpreter → registry / chat → wake gate
//!
//! # Architecture
//!
//! - **Feature keys**: the closed set of workloads (`face`, `hand`, `chatbot`)
//! - **Interpreter**: pure keyword classification of free text into a [`Command`]
//! - **Wake gate**: detector delegation or polling + strict phrase matching
//! - **Process registry**: at most one live child process per feature
//! - **Controller**: the blocking state machine that serializes everything
//!
//! Speech transport and the conversational engine are external collaborators
//! reached through the traits in [`speech`] and [`chat`].

pub mod app_dirs;
pub mod chat;
pub mod config;
pub mod controller;
pub mod error;
pub mod feature;
pub mod interpreter;
pub mod registry;
pub mod runtime;
pub mod speech;
#[doc(hidden)]
pub mod test_utils;
pub mod wake;

pub use config::ControlConfig;
pub use controller::{Controller, ControllerState};
pub use error::{ControlError, Result};
pub use feature::FeatureKey;
pub use interpreter::{Action, Command, classify};
pub use registry::ProcessRegistry;
pub use runtime::ControllerEvent;
