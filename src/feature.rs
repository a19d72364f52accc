//! Feature workload identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fixed workloads the controller can start or stop.
///
/// `Chatbot` runs in-process through the chat engine and is never tracked by
/// the process registry; the other keys run as child processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKey {
    /// Face recognition workload.
    Face,
    /// Hand / finger tracking workload.
    Hand,
    /// Conversational assistant (in-process).
    Chatbot,
}

impl FeatureKey {
    /// Keys that run as tracked child processes, in status-report order.
    pub const SPAWNABLE: [Self; 2] = [Self::Face, Self::Hand];

    /// Returns `true` if this feature runs inside the controller rather than
    /// as a child process.
    pub fn is_in_process(self) -> bool {
        matches!(self, Self::Chatbot)
    }

    /// Lowercase label used in speech and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Face => "face",
            Self::Hand => "hand",
            Self::Chatbot => "chatbot",
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn display_labels() {
        assert_eq!(FeatureKey::Face.to_string(), "face");
        assert_eq!(FeatureKey::Hand.to_string(), "hand");
        assert_eq!(FeatureKey::Chatbot.to_string(), "chatbot");
    }

    #[test]
    fn only_chatbot_is_in_process() {
        assert!(FeatureKey::Chatbot.is_in_process());
        assert!(!FeatureKey::Face.is_in_process());
        assert!(!FeatureKey::Hand.is_in_process());
        assert!(!FeatureKey::SPAWNABLE.contains(&FeatureKey::Chatbot));
    }
}
