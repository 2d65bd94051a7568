//! # Tutoring Logic
//!
//! The pedagogical half of the service: the fixed persona prompt, the
//! closed set of tutoring modes with their instruction fragments, topic
//! normalization for dictation, and the turn orchestrator tying the
//! stores and upstream providers together.

pub mod engine;
pub mod modes;

pub use engine::{DictationStep, TalkOutcome, TutorEngine};
pub use modes::TutorMode;
