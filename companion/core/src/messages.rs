//! Speech Bubble Messages
//!
//! Candidate lines per state. A theme may ship `messages.json`, which
//! replaces the built-in table wholesale. A state with an empty or missing
//! list gets no bubble.

use std::collections::HashMap;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::state::CompanionState;

/// File name of a theme's message table
pub const MESSAGES_FILE_NAME: &str = "messages.json";

/// Built-in lines used when a theme ships none
const DEFAULT_MESSAGES: [(CompanionState, &[&str]); 8] = [
    (CompanionState::Idle, &["...", "Standing by.", "Ready when you are."]),
    (CompanionState::Greeting, &["Hello!", "Hi there!", "Let's get started!"]),
    (CompanionState::Working, &["On it...", "Working...", "Let me check."]),
    (CompanionState::Success, &["Done!", "Nailed it!", "That worked."]),
    (CompanionState::Error, &["Oops!", "Hmm, that failed.", "Let's try again."]),
    (CompanionState::Celebrating, &["All done!", "We did it!", "Great work!"]),
    (CompanionState::Sleeping, &["Zzz...", "*yawn*"]),
    (CompanionState::Farewell, &["Bye!", "See you soon!", "Until next time!"]),
];

/// Message lists keyed by state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageBook {
    entries: HashMap<CompanionState, Vec<String>>,
}

impl Default for MessageBook {
    fn default() -> Self {
        let entries = DEFAULT_MESSAGES
            .iter()
            .map(|(state, lines)| (*state, lines.iter().map(|s| (*s).to_string()).collect()))
            .collect();
        Self { entries }
    }
}

impl MessageBook {
    /// Book with only the given entries
    #[must_use]
    pub fn from_entries(entries: HashMap<CompanionState, Vec<String>>) -> Self {
        Self { entries }
    }

    /// Parse a `messages.json` document
    ///
    /// Keys that name no state are ignored.
    ///
    /// # Errors
    ///
    /// Returns the decode error for anything that is not an object of
    /// string lists.
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(input)?;
        let entries = raw
            .into_iter()
            .filter_map(|(name, lines)| match name.parse::<CompanionState>() {
                Ok(state) => Some((state, lines)),
                Err(_) => {
                    debug!(key = %name, "Ignoring messages for unknown state");
                    None
                }
            })
            .collect();
        Ok(Self { entries })
    }

    /// Load `messages.json` from a theme directory
    ///
    /// Missing or invalid files yield the built-in table.
    #[must_use]
    pub fn load(theme_dir: &Path) -> Self {
        let path = theme_dir.join(MESSAGES_FILE_NAME);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read messages, using defaults");
                return Self::default();
            }
        };
        Self::from_json(&content).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "Invalid messages file, using defaults");
            Self::default()
        })
    }

    /// Lines for `state` (empty when none)
    #[must_use]
    pub fn lines(&self, state: CompanionState) -> &[String] {
        self.entries.get(&state).map_or(&[], Vec::as_slice)
    }

    /// Pick one line for `state` uniformly at random
    pub fn pick<R: Rng + ?Sized>(&self, state: CompanionState, rng: &mut R) -> Option<&str> {
        self.lines(state).choose(rng).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_defaults_cover_every_state() {
        let book = MessageBook::default();
        for state in CompanionState::ALL {
            assert!(!book.lines(state).is_empty(), "{state} has no messages");
        }
    }

    #[test]
    fn test_file_replaces_defaults() {
        let book = MessageBook::from_json(r#"{"greeting": ["Hello!", "Hi there!"], "bogus": ["x"]}"#).unwrap();
        assert_eq!(book.lines(CompanionState::Greeting), ["Hello!", "Hi there!"]);
        assert!(book.lines(CompanionState::Error).is_empty());
    }

    #[test]
    fn test_load_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(MessageBook::load(dir.path()), MessageBook::default());

        std::fs::write(dir.path().join(MESSAGES_FILE_NAME), "{ invalid }").unwrap();
        assert_eq!(MessageBook::load(dir.path()), MessageBook::default());

        std::fs::write(dir.path().join(MESSAGES_FILE_NAME), r#"{"idle": []}"#).unwrap();
        let book = MessageBook::load(dir.path());
        assert!(book.lines(CompanionState::Idle).is_empty());
    }

    #[test]
    fn test_pick_is_seeded() {
        let book = MessageBook::default();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for state in CompanionState::ALL {
            let line = book.pick(state, &mut a);
            assert_eq!(line, book.pick(state, &mut b));
            assert!(book.lines(state).iter().any(|l| Some(l.as_str()) == line));
        }
    }

    #[test]
    fn test_pick_empty_list_is_none() {
        let book = MessageBook::from_entries(HashMap::new());
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(book.pick(CompanionState::Success, &mut rng), None);
    }
}
