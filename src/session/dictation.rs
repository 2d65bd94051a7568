//! Dictation exercise state machine and store.
//!
//! One exercise per session id: a topic, exactly six items (four single
//! words followed by two short sentences) generated once at start, and a
//! cursor that only ever moves forward by one.
//!
//! ## Exercise Lifecycle:
//! 1. **Ready**: items generated, cursor at 0
//! 2. **InProgress**: 0 < cursor < 6, learner is working through items
//! 3. **Complete**: cursor reached 6; further steps are idempotent reads
//!
//! Starting a new dictation for a session replaces any prior exercise
//! outright; there is no merge.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Fixed number of items per exercise: four words, then two sentences.
pub const ITEM_COUNT: usize = 6;

/// Filler used when the generator returns fewer lines than needed.
/// Degraded but non-fatal: the exercise always has exactly six items.
pub const FILLER_WORD: &str = "Hallo";

/// Lifecycle phase of one exercise, derived from the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictationPhase {
    Ready,
    InProgress,
    Complete,
}

/// One per-session dictation exercise. Items are fixed after creation;
/// only the cursor moves.
#[derive(Debug, Clone)]
pub struct DictationExercise {
    topic: String,
    items: Vec<String>,
    cursor: usize,
}

impl DictationExercise {
    /// Build an exercise from generator output, normalizing the item list
    /// to exactly [`ITEM_COUNT`] entries.
    pub fn new(topic: String, raw_lines: &str) -> Self {
        Self {
            topic,
            items: shape_items(raw_lines),
            cursor: 0,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn phase(&self) -> DictationPhase {
        if self.cursor == 0 {
            DictationPhase::Ready
        } else if self.cursor < self.items.len() {
            DictationPhase::InProgress
        } else {
            DictationPhase::Complete
        }
    }
}

/// Normalize generator output into exactly [`ITEM_COUNT`] non-empty lines.
///
/// The generation prompt forbids numbering and bullets, but models drift;
/// leading list markers are stripped rather than trusted. Short output is
/// padded with [`FILLER_WORD`], long output truncated.
pub fn shape_items(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = raw
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .take(ITEM_COUNT)
        .collect();

    while items.len() < ITEM_COUNT {
        items.push(FILLER_WORD.to_string());
    }

    items
}

/// Remove a leading "1.", "2)", "-", "*" or "•" marker plus whitespace.
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let unnumbered = line
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['.', ')']);
    let stripped = if unnumbered.len() < line.len() {
        unnumbered
    } else {
        line.trim_start_matches(['-', '*', '•'])
    };
    stripped.trim()
}

/// Result of advancing a session's dictation cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// No exercise exists for this session id
    NotStarted,

    /// The cursor is already past the last item; nothing was advanced
    AlreadyComplete,

    /// The next item was revealed and the cursor moved forward by one
    Revealed {
        /// Zero-based position of the revealed item
        index: usize,
        /// The item the learner should transcribe
        text: String,
        /// True when this reveal consumed the final item
        done: bool,
    },
}

/// Thread-safe map from session id to its dictation exercise.
///
/// ## Thread Safety:
/// Reading the current item and incrementing the cursor happen inside a
/// single write-lock scope, so two concurrent step requests for the same
/// session cannot double-advance or reveal the same item twice.
#[derive(Clone)]
pub struct DictationStore {
    exercises: Arc<RwLock<HashMap<String, DictationExercise>>>,
}

impl DictationStore {
    pub fn new() -> Self {
        Self {
            exercises: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Install a freshly generated exercise, replacing any prior one for
    /// the session.
    pub fn start(&self, session_id: &str, exercise: DictationExercise) {
        let mut exercises = self.exercises.write().unwrap();
        exercises.insert(session_id.to_string(), exercise);
    }

    /// Advance the cursor by exactly one and reveal the item it passed.
    ///
    /// Terminal state is an idempotent read: once the cursor has consumed
    /// every item, further calls report [`AdvanceOutcome::AlreadyComplete`]
    /// without moving anything.
    pub fn advance(&self, session_id: &str) -> AdvanceOutcome {
        let mut exercises = self.exercises.write().unwrap();

        let Some(exercise) = exercises.get_mut(session_id) else {
            return AdvanceOutcome::NotStarted;
        };

        if exercise.cursor >= exercise.items.len() {
            return AdvanceOutcome::AlreadyComplete;
        }

        let index = exercise.cursor;
        let text = exercise.items[index].clone();
        exercise.cursor += 1;

        AdvanceOutcome::Revealed {
            index,
            text,
            done: exercise.cursor == exercise.items.len(),
        }
    }

    /// Topic of the session's exercise, if one exists.
    pub fn topic(&self, session_id: &str) -> Option<String> {
        let exercises = self.exercises.read().unwrap();
        exercises.get(session_id).map(|e| e.topic.clone())
    }

    /// Remove a session's exercise. Unknown ids are a no-op.
    pub fn remove(&self, session_id: &str) -> bool {
        let mut exercises = self.exercises.write().unwrap();
        exercises.remove(session_id).is_some()
    }

    /// Number of sessions with an exercise in any phase.
    pub fn exercise_count(&self) -> usize {
        let exercises = self.exercises.read().unwrap();
        exercises.len()
    }
}

impl Default for DictationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_items_exact_output() {
        let raw = "Jause\nSemmel\nSackerl\nMarille\nIch esse eine Semmel.\nDie Jause schmeckt gut.";
        let items = shape_items(raw);
        assert_eq!(items.len(), ITEM_COUNT);
        assert_eq!(items[0], "Jause");
        assert_eq!(items[5], "Die Jause schmeckt gut.");
    }

    #[test]
    fn test_shape_items_pads_short_output() {
        let items = shape_items("Paradeiser\n\n  \nErdäpfel");
        assert_eq!(items.len(), ITEM_COUNT);
        assert_eq!(items[0], "Paradeiser");
        assert_eq!(items[1], "Erdäpfel");
        assert_eq!(items[2], FILLER_WORD);
        assert_eq!(items[5], FILLER_WORD);
    }

    #[test]
    fn test_shape_items_truncates_long_output() {
        let raw = (1..=9).map(|i| format!("wort{}\n", i)).collect::<String>();
        let items = shape_items(&raw);
        assert_eq!(items.len(), ITEM_COUNT);
        assert_eq!(items[5], "wort6");
    }

    #[test]
    fn test_shape_items_strips_list_markers() {
        let raw = "1. Topfen\n2) Obers\n- Palatschinken\n* Bim\n• Heuer\nDer Sessel ist alt.";
        let items = shape_items(raw);
        assert_eq!(
            items,
            vec![
                "Topfen",
                "Obers",
                "Palatschinken",
                "Bim",
                "Heuer",
                "Der Sessel ist alt."
            ]
        );
    }

    #[test]
    fn test_advance_without_exercise() {
        let store = DictationStore::new();
        assert_eq!(store.advance("ghost"), AdvanceOutcome::NotStarted);
    }

    #[test]
    fn test_cursor_advances_by_one_until_done() {
        let store = DictationStore::new();
        store.start(
            "s1",
            DictationExercise::new("Jause".into(), "a\nb\nc\nd\ne\nf"),
        );

        for (expected_index, expected_text) in ["a", "b", "c", "d", "e", "f"].iter().enumerate() {
            match store.advance("s1") {
                AdvanceOutcome::Revealed { index, text, done } => {
                    assert_eq!(index, expected_index);
                    assert_eq!(&text, expected_text);
                    assert_eq!(done, expected_index == ITEM_COUNT - 1);
                }
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
    }

    #[test]
    fn test_terminal_state_is_idempotent() {
        let store = DictationStore::new();
        store.start(
            "s1",
            DictationExercise::new("Schule".into(), "a\nb\nc\nd\ne\nf"),
        );

        for _ in 0..ITEM_COUNT {
            store.advance("s1");
        }

        assert_eq!(store.advance("s1"), AdvanceOutcome::AlreadyComplete);
        assert_eq!(store.advance("s1"), AdvanceOutcome::AlreadyComplete);
    }

    #[test]
    fn test_start_replaces_prior_exercise() {
        let store = DictationStore::new();
        store.start(
            "s1",
            DictationExercise::new("Tiere".into(), "a\nb\nc\nd\ne\nf"),
        );
        store.advance("s1");
        store.advance("s1");

        store.start(
            "s1",
            DictationExercise::new("Wetter".into(), "u\nv\nw\nx\ny\nz"),
        );
        assert_eq!(store.topic("s1").as_deref(), Some("Wetter"));

        match store.advance("s1") {
            AdvanceOutcome::Revealed { index, text, .. } => {
                assert_eq!(index, 0);
                assert_eq!(text, "u");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_phase_transitions() {
        let mut exercise = DictationExercise::new("Uhr".into(), "a\nb\nc\nd\ne\nf");
        assert_eq!(exercise.phase(), DictationPhase::Ready);

        exercise.cursor = 3;
        assert_eq!(exercise.phase(), DictationPhase::InProgress);

        exercise.cursor = ITEM_COUNT;
        assert_eq!(exercise.phase(), DictationPhase::Complete);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = DictationStore::new();
        store.start(
            "s1",
            DictationExercise::new("Farben".into(), "a\nb\nc\nd\ne\nf"),
        );

        assert!(store.remove("s1"));
        assert!(!store.remove("s1"));
        assert!(!store.remove("unknown"));
    }
}
