//! Runtime events emitted by the controller for embedders and tests.
//!
//! Events are sent on an unbounded channel so the controller never waits on
//! an observer.

use crate::controller::ControllerState;
use crate::feature::FeatureKey;
use crate::interpreter::Command;
use tokio::sync::mpsc;

/// Events that describe what the controller is doing "right now".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// The state machine moved between states.
    StateChanged {
        from: ControllerState,
        to: ControllerState,
    },
    /// A line was spoken to the operator.
    Spoke(String),
    /// A classified command is about to be dispatched.
    Dispatched(Command),
    /// A started feature process exited on its own.
    FeatureExited {
        key: FeatureKey,
        /// Exit code, if the process exited normally.
        code: Option<i32>,
    },
}

/// Sending half of the controller event channel.
pub type EventSender = mpsc::UnboundedSender<ControllerEvent>;
/// Receiving half of the controller event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<ControllerEvent>;

/// Creates a controller event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
