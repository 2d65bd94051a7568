//! # Per-Session State
//!
//! Both stores the service owns live here, keyed by the opaque session id
//! the client echoes back between requests:
//!
//! - **Conversation store**: the bounded sliding window of user/assistant
//!   turns fed back into the chat prompt.
//! - **Dictation store**: the per-session dictation exercise state machine
//!   (topic, six fixed items, cursor).
//!
//! The stores are independently keyed; resetting one never implies
//! resetting the other unless the caller targets both. Nothing is
//! persisted; state lives until an explicit reset or process restart.

pub mod dictation;
pub mod history;

pub use dictation::{AdvanceOutcome, DictationExercise, DictationStore};
pub use history::ConversationStore;
