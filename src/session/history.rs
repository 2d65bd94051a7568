//! Conversation history store with sliding-window eviction.
//!
//! Each session id maps to an ordered sequence of chat records. The
//! sequence is capped at `2 * max_turns` entries; every append truncates
//! to the most recent window, oldest records first. Only the turn
//! orchestrator mutates this store, one user/assistant pair per
//! conversational turn.

use crate::providers::ChatMessage;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe map from session id to its bounded conversation window.
///
/// ## Thread Safety:
/// The map sits behind one `RwLock`; every mutation (append + truncate,
/// removal) happens inside a single write-lock scope, so concurrent
/// requests on the same session id cannot interleave a read-modify-write
/// and corrupt the window. No lock is ever held across an upstream call.
#[derive(Clone)]
pub struct ConversationStore {
    sessions: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
    max_turns: usize,
}

impl ConversationStore {
    /// Create a store keeping at most `max_turns` user/assistant pairs
    /// per session.
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            max_turns,
        }
    }

    /// Snapshot of a session's history, oldest first.
    ///
    /// Unknown ids yield an empty sequence; no entry is created until the
    /// first append.
    pub fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        let sessions = self.sessions.read().unwrap();
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    /// Append one completed turn (user utterance + assistant reply), then
    /// evict the oldest records beyond the window.
    pub fn append_exchange(&self, session_id: &str, user_text: &str, assistant_text: &str) {
        let mut sessions = self.sessions.write().unwrap();
        let history = sessions.entry(session_id.to_string()).or_default();

        history.push(ChatMessage::user(user_text));
        history.push(ChatMessage::assistant(assistant_text));

        let window = self.max_turns * 2;
        if history.len() > window {
            let excess = history.len() - window;
            history.drain(..excess);
        }
    }

    /// Remove a session's history. Unknown ids are a no-op.
    pub fn remove(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(session_id).is_some()
    }

    /// Number of sessions currently holding history.
    pub fn session_count(&self) -> usize {
        let sessions = self.sessions.read().unwrap();
        sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ChatRole;

    #[test]
    fn test_unknown_session_is_empty_and_not_created() {
        let store = ConversationStore::new(6);
        assert!(store.history("nobody").is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_append_keeps_order() {
        let store = ConversationStore::new(6);
        store.append_exchange("s1", "Hallo", "Servus!");
        store.append_exchange("s1", "Wie geht's?", "Leiwand, danke!");

        let history = store.history("s1");
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].content, "Hallo");
        assert_eq!(history[3].role, ChatRole::Assistant);
        assert_eq!(history[3].content, "Leiwand, danke!");
    }

    #[test]
    fn test_sliding_window_evicts_oldest() {
        let store = ConversationStore::new(6);
        for turn in 1..=8 {
            store.append_exchange("s1", &format!("frage {}", turn), &format!("antwort {}", turn));
        }

        let history = store.history("s1");
        // 8 turns against a 6-turn window: records for turns 3..=8 remain.
        assert_eq!(history.len(), 12);
        assert_eq!(history[0].content, "frage 3");
        assert_eq!(history[11].content, "antwort 8");
    }

    #[test]
    fn test_window_grows_to_exactly_min_2n() {
        let store = ConversationStore::new(6);
        for turn in 0..4 {
            store.append_exchange("s1", &format!("u{}", turn), &format!("a{}", turn));
        }
        assert_eq!(store.history("s1").len(), 8);
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = ConversationStore::new(6);
        store.append_exchange("a", "eins", "zwei");
        store.append_exchange("b", "drei", "vier");

        assert_eq!(store.history("a").len(), 2);
        assert_eq!(store.history("b").len(), 2);
        assert_eq!(store.history("a")[0].content, "eins");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = ConversationStore::new(6);
        store.append_exchange("s1", "Hallo", "Servus!");

        assert!(store.remove("s1"));
        assert!(!store.remove("s1"));
        assert!(!store.remove("never-existed"));
        assert!(store.history("s1").is_empty());
    }
}
