//! Fixed-grammar classification of spoken commands.
//!
//! Free text is reduced to an `(action, target)` pair by keyword lookup. The
//! grammar is closed: anything outside it classifies as `(None, None)` and
//! the controller treats it as unrecognized.
//!
//! # Grammar
//!
//! | Keywords | Effect |
//! |----------|--------|
//! | start, run, open, launch | action = `Start` |
//! | stop, close, terminate, quit, shutdown, end | action = `Stop` (overrides start) |
//! | chat, assistant, bot | target = `chatbot` |
//! | face, recognize, recognition | target = `face` |
//! | hand, servo, object, finger | target = `hand` |
//! | status | `(Status, none)`, overrides everything |
//!
//! Keywords match whole words, case-insensitively, anywhere in the text.
//! Inflected forms are not stemmed: "starting" is not "start", and "friend"
//! does not contain the stop verb "end".

use crate::feature::FeatureKey;
use std::fmt;

const START_VERBS: &[&str] = &["start", "run", "open", "launch"];
const STOP_VERBS: &[&str] = &["stop", "close", "terminate", "quit", "shutdown", "end"];
const CHATBOT_NOUNS: &[&str] = &["chat", "assistant", "bot"];
const FACE_NOUNS: &[&str] = &["face", "recognize", "recognition"];
const HAND_NOUNS: &[&str] = &["hand", "servo", "object", "finger"];
const STATUS_TOKEN: &str = "status";

/// What the operator asked the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Launch a feature.
    Start,
    /// Terminate a feature.
    Stop,
    /// Report every feature's liveness.
    Status,
    /// Nothing recognizable.
    None,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Status => "status",
            Self::None => "none",
        };
        f.write_str(label)
    }
}

/// A classified utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub action: Action,
    pub target: Option<FeatureKey>,
    /// The text as heard, before normalization.
    pub raw: String,
}

impl Command {
    /// Returns `true` when the command names both a start/stop action and a
    /// target, or is a status query.
    pub fn is_actionable(&self) -> bool {
        match self.action {
            Action::Status => true,
            Action::Start | Action::Stop => self.target.is_some(),
            Action::None => false,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            Some(target) => write!(f, "({}, {target})", self.action),
            None => write!(f, "({}, none)", self.action),
        }
    }
}

/// Classifies free text into a [`Command`].
///
/// Stop verbs are evaluated after start verbs and win when both appear. A
/// `status` token overrides any action and target. If either the action or
/// the target is missing the result is `(None, None)`.
pub fn classify(text: &str) -> Command {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has_any = |words: &[&str]| tokens.iter().any(|t| words.contains(t));

    let raw = text.to_owned();

    if tokens.contains(&STATUS_TOKEN) {
        return Command {
            action: Action::Status,
            target: None,
            raw,
        };
    }

    let mut action = Action::None;
    if has_any(START_VERBS) {
        action = Action::Start;
    }
    if has_any(STOP_VERBS) {
        action = Action::Stop;
    }

    let target = if has_any(CHATBOT_NOUNS) {
        Some(FeatureKey::Chatbot)
    } else if has_any(FACE_NOUNS) {
        Some(FeatureKey::Face)
    } else if has_any(HAND_NOUNS) {
        Some(FeatureKey::Hand)
    } else {
        None
    };

    match (action, target) {
        (Action::None, _) | (_, None) => Command {
            action: Action::None,
            target: None,
            raw,
        },
        (action, target) => Command {
            action,
            target,
            raw,
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn pair(text: &str) -> (Action, Option<FeatureKey>) {
        let cmd = classify(text);
        (cmd.action, cmd.target)
    }

    #[test]
    fn start_hand_tracker() {
        assert_eq!(
            pair("please start the hand tracker"),
            (Action::Start, Some(FeatureKey::Hand))
        );
    }

    #[test]
    fn stop_face_recognition() {
        assert_eq!(
            pair("Close face recognition"),
            (Action::Stop, Some(FeatureKey::Face))
        );
    }

    #[test]
    fn chatbot_nouns() {
        assert_eq!(pair("open the assistant"), (Action::Start, Some(FeatureKey::Chatbot)));
        assert_eq!(pair("launch chat"), (Action::Start, Some(FeatureKey::Chatbot)));
        assert_eq!(pair("run the bot"), (Action::Start, Some(FeatureKey::Chatbot)));
    }

    #[test]
    fn hand_synonyms() {
        for noun in ["servo", "object", "finger"] {
            assert_eq!(
                pair(&format!("start {noun}")),
                (Action::Start, Some(FeatureKey::Hand)),
                "noun {noun}"
            );
        }
    }

    #[test]
    fn stop_verb_wins_over_start_verb() {
        assert_eq!(
            pair("start and then stop the face"),
            (Action::Stop, Some(FeatureKey::Face))
        );
        assert_eq!(pair("open then close hand"), (Action::Stop, Some(FeatureKey::Hand)));
    }

    #[test]
    fn target_precedence_chatbot_then_face_then_hand() {
        assert_eq!(
            pair("start the face bot"),
            (Action::Start, Some(FeatureKey::Chatbot))
        );
        assert_eq!(
            pair("start face and hand"),
            (Action::Start, Some(FeatureKey::Face))
        );
    }

    #[test]
    fn status_overrides_everything() {
        assert_eq!(pair("what's the status now"), (Action::Status, None));
        assert_eq!(pair("stop the hand and give me status"), (Action::Status, None));
        assert_eq!(pair("STATUS"), (Action::Status, None));
    }

    #[test]
    fn unrecognized_text_is_none_none() {
        assert_eq!(pair("what is the weather like"), (Action::None, None));
        assert_eq!(pair(""), (Action::None, None));
    }

    #[test]
    fn action_without_target_is_none_none() {
        assert_eq!(pair("start it please"), (Action::None, None));
    }

    #[test]
    fn target_without_action_is_none_none() {
        assert_eq!(pair("the face"), (Action::None, None));
    }

    #[test]
    fn keywords_match_whole_words_only() {
        // "friend" contains "end", "robot" contains "bot".
        assert_eq!(pair("my friend the robot"), (Action::None, None));
        assert_eq!(pair("restart handle"), (Action::None, None));
    }

    #[test]
    fn raw_text_is_preserved() {
        let cmd = classify("Start The Hand");
        assert_eq!(cmd.raw, "Start The Hand");
        assert!(cmd.is_actionable());
    }

    #[test]
    fn display_format() {
        assert_eq!(classify("start hand").to_string(), "(start, hand)");
        assert_eq!(classify("status").to_string(), "(status, none)");
        assert_eq!(classify("hello").to_string(), "(none, none)");
    }

    #[test]
    fn inflected_verbs_are_not_keywords() {
        assert_eq!(classify("starting face recognition").action, Action::None);
        assert_eq!(classify("stopping the hand").action, Action::None);
        assert_eq!(classify("my friend has a robot").to_string(), "(none, none)");
    }
}
