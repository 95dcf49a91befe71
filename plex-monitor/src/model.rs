//! Session identity and the playback state machine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned key of a playback session
///
/// Opaque and only stable for the lifetime of one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        SessionKey::new(s)
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        SessionKey::new(s)
    }
}

/// Playback state as reported by a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    /// Transient; never stored and never announced
    Buffering,
    /// Any state this crate does not know about (e.g. "seeking")
    Other(String),
}

impl PlaybackState {
    /// Parse the `state` field of a play session notification
    pub fn parse(raw: &str) -> Self {
        match raw {
            "playing" => PlaybackState::Playing,
            "paused" => PlaybackState::Paused,
            "stopped" => PlaybackState::Stopped,
            "buffering" => PlaybackState::Buffering,
            other => PlaybackState::Other(other.to_string()),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackState::Buffering)
    }
}

/// Last accepted state of a session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No notification accepted yet
    #[default]
    Unknown,
    Playing,
    Paused,
    Stopped,
    Other(String),
}

impl SessionState {
    fn matches(&self, incoming: &PlaybackState) -> bool {
        match (self, incoming) {
            (SessionState::Playing, PlaybackState::Playing)
            | (SessionState::Paused, PlaybackState::Paused)
            | (SessionState::Stopped, PlaybackState::Stopped) => true,
            (SessionState::Other(a), PlaybackState::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unknown => write!(f, "unknown"),
            SessionState::Playing => write!(f, "playing"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Other(state) => write!(f, "{}", state),
        }
    }
}

/// Kind of session event an accepted state change announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    Start,
    Pause,
    Stop,
}

/// Why a notification was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// `buffering`
    Transient,
    /// Same as the last accepted state
    Duplicate,
}

/// Outcome of feeding one notification into the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Discard(DiscardReason),
    Accept {
        next: SessionState,
        emit: Option<SessionEventKind>,
    },
}

/// Transition function of the session state machine
pub fn transition(last: &SessionState, incoming: &PlaybackState) -> Transition {
    let (next, emit) = match incoming {
        PlaybackState::Buffering => return Transition::Discard(DiscardReason::Transient),
        _ if last.matches(incoming) => return Transition::Discard(DiscardReason::Duplicate),
        PlaybackState::Playing => (SessionState::Playing, Some(SessionEventKind::Start)),
        PlaybackState::Paused => (SessionState::Paused, Some(SessionEventKind::Pause)),
        PlaybackState::Stopped => (SessionState::Stopped, Some(SessionEventKind::Stop)),
        PlaybackState::Other(state) => (SessionState::Other(state.clone()), None),
    };

    Transition::Accept { next, emit }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(SessionState::Unknown, "playing", Some(SessionEventKind::Start))]
    #[case(SessionState::Playing, "paused", Some(SessionEventKind::Pause))]
    #[case(SessionState::Paused, "playing", Some(SessionEventKind::Start))]
    #[case(SessionState::Playing, "stopped", Some(SessionEventKind::Stop))]
    #[case(SessionState::Stopped, "seeking", None)]
    fn test_accepted_transitions(
        #[case] last: SessionState,
        #[case] raw: &str,
        #[case] emit: Option<SessionEventKind>,
    ) {
        match transition(&last, &PlaybackState::parse(raw)) {
            Transition::Accept { next, emit: got } => {
                assert_eq!(got, emit);
                assert_eq!(next.to_string(), raw);
            }
            other => panic!("expected accept, got {:?}", other),
        }
    }

    #[test]
    fn test_buffering_is_always_discarded() {
        for last in [
            SessionState::Unknown,
            SessionState::Playing,
            SessionState::Paused,
            SessionState::Other("seeking".to_string()),
        ] {
            assert_eq!(
                transition(&last, &PlaybackState::Buffering),
                Transition::Discard(DiscardReason::Transient)
            );
        }
    }

    #[test]
    fn test_duplicate_unknown_state() {
        let last = SessionState::Other("seeking".to_string());
        assert_eq!(
            transition(&last, &PlaybackState::parse("seeking")),
            Transition::Discard(DiscardReason::Duplicate)
        );
    }

    #[test]
    fn test_session_key_display() {
        assert_eq!(SessionKey::from("42").to_string(), "42");
        assert_eq!(SessionKey::new("42"), SessionKey::from("42".to_string()));
    }

    fn raw_state() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("playing".to_string()),
            Just("paused".to_string()),
            Just("stopped".to_string()),
            Just("buffering".to_string()),
            "[a-z]{3,8}",
        ]
    }

    proptest! {
        /// Feeding any sequence through the state machine announces exactly the
        /// changes left after dropping transient states and collapsing repeats.
        #[test]
        fn prop_events_match_collapsed_sequence(states in prop::collection::vec(raw_state(), 0..40)) {
            let mut last = SessionState::Unknown;
            let mut emitted = Vec::new();
            for raw in &states {
                if let Transition::Accept { next, emit } = transition(&last, &PlaybackState::parse(raw)) {
                    prop_assert_ne!(&next, &last);
                    emitted.extend(emit);
                    last = next;
                }
            }

            let mut collapsed: Vec<&str> = states
                .iter()
                .map(String::as_str)
                .filter(|s| *s != "buffering")
                .collect();
            collapsed.dedup();
            let expected: Vec<SessionEventKind> = collapsed
                .iter()
                .filter_map(|s| match *s {
                    "playing" => Some(SessionEventKind::Start),
                    "paused" => Some(SessionEventKind::Pause),
                    "stopped" => Some(SessionEventKind::Stop),
                    _ => None,
                })
                .collect();

            prop_assert_eq!(emitted, expected);
        }
    }
}
