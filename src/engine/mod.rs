//! Conversational engine — intent classification, per-user context,
//! specification enrichment, and response generation.

pub mod enrich;
pub mod history;
pub mod intent;
pub mod prompt;
pub mod responder;

pub use enrich::SpecEnricher;
pub use history::{ConversationStore, Turn};
pub use intent::{Intent, IntentClassifier};
pub use responder::{Reply, ResponseEngine};

/// Truncate to at most `max` characters without splitting a UTF-8 boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
