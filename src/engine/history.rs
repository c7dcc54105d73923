//! Per-user conversation history with a sliding window.
//!
//! Process-lifetime in-memory state, keyed strictly by user identifier.
//! The append-and-trim for one exchange happens under a single lock so
//! concurrent messages from the same user cannot lose a turn or overflow
//! the cap.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::llm::Role;

/// Maximum turns retained per user (5 user/assistant exchanges).
pub const MAX_TURNS: usize = 10;

/// One message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Bounded per-user turn sequences.
#[derive(Debug, Default)]
pub struct ConversationStore {
    inner: Mutex<HashMap<String, Vec<Turn>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user/assistant exchange and trim to the most recent
    /// `MAX_TURNS` turns. Atomic per call: read-modify-write happens under
    /// one lock.
    pub fn append_exchange(&self, user_id: &str, user_text: &str, reply: &str) {
        let mut inner = self.inner.lock().expect("ConversationStore mutex poisoned");
        let turns = inner.entry(user_id.to_string()).or_default();
        turns.push(Turn::user(user_text));
        turns.push(Turn::assistant(reply));
        if turns.len() > MAX_TURNS {
            let excess = turns.len() - MAX_TURNS;
            turns.drain(..excess);
        }
    }

    /// Ordered turn sequence for a user; empty if unseen.
    pub fn turns(&self, user_id: &str) -> Vec<Turn> {
        let inner = self.inner.lock().expect("ConversationStore mutex poisoned");
        inner.get(user_id).cloned().unwrap_or_default()
    }

    /// Number of retained turns for a user.
    pub fn len(&self, user_id: &str) -> usize {
        let inner = self.inner.lock().expect("ConversationStore mutex poisoned");
        inner.get(user_id).map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self, user_id: &str) -> bool {
        self.len(user_id) == 0
    }

    /// Remove all history for one user. Other users are untouched.
    pub fn clear(&self, user_id: &str) {
        let mut inner = self.inner.lock().expect("ConversationStore mutex poisoned");
        inner.remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_user_has_empty_history() {
        let store = ConversationStore::new();
        assert!(store.turns("nobody").is_empty());
        assert_eq!(store.len("nobody"), 0);
    }

    #[test]
    fn cap_retains_most_recent_turns_in_order() {
        let store = ConversationStore::new();
        for i in 0..8 {
            store.append_exchange("u1", &format!("q{i}"), &format!("a{i}"));
        }

        // 8 exchanges = 16 turns appended, only the last 10 retained
        let turns = store.turns("u1");
        assert_eq!(turns.len(), MAX_TURNS);
        assert_eq!(turns[0], Turn::user("q3"));
        assert_eq!(turns[9], Turn::assistant("a7"));
    }

    #[test]
    fn length_is_min_of_appended_and_cap() {
        let store = ConversationStore::new();
        for n in 1..=8 {
            store.append_exchange("u1", "q", "a");
            assert_eq!(store.len("u1"), MAX_TURNS.min(n * 2));
        }
    }

    #[test]
    fn clear_removes_only_that_user() {
        let store = ConversationStore::new();
        store.append_exchange("u1", "oi", "olá");
        store.append_exchange("u2", "hey", "e ai");

        store.clear("u1");
        assert!(store.is_empty("u1"));
        assert_eq!(store.len("u2"), 2);
    }

    #[test]
    fn histories_are_isolated_per_user() {
        let store = ConversationStore::new();
        store.append_exchange("u1", "sou u1", "oi u1");
        store.append_exchange("u2", "sou u2", "oi u2");

        assert_eq!(store.turns("u1")[0].content, "sou u1");
        assert_eq!(store.turns("u2")[0].content, "sou u2");
    }

    #[test]
    fn concurrent_appends_never_exceed_cap() {
        use std::sync::Arc;

        let store = Arc::new(ConversationStore::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append_exchange("shared", &format!("q{t}-{i}"), "a");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len("shared"), MAX_TURNS);
    }
}
