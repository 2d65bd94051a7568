//! Tutoring modes, persona prompt and topic normalization.
//!
//! A mode is a label selecting which instruction fragment is appended to
//! the fixed persona prompt for a turn. The set is closed; anything
//! unrecognized silently falls back to plain chat rather than erroring,
//! since a stale client dropdown should never break a conversation.

use rand::seq::SliceRandom;

/// The fixed persona every mode shares. Mode fragments narrow it, they
/// never replace it.
pub const SYSTEM_PROMPT: &str = "\
Du bist 'DeutschCoach', eine freundliche Deutschlehrerin / ein freundlicher Deutschlehrer für ein Volksschulkind (Anfänger, nicht-muttersprachlich).

Sprich Deutsch in österreichischer Variante (de-AT):
- verwende 'du'
- kurze, klare Sätze (1–3 Sätze)
- warm, geduldig, wie in der Volksschule
- verwende regelmäßig (aber nicht übertrieben) österreichische Wörter und Ausdrücke

Österreich-Wortschatz (verwende passend im Kontext):
Jänner, heuer, leiwand, Jause, Sackerl, Paradeiser, Marille, Erdäpfel, Topfen, Obers,
Sessel (nicht Stuhl), Mistkübel, Rauchfangkehrer, Bim, Semmel, Palatschinken

Schulkontext Österreich:
Volksschule, große Pause, Turnstunde, Hausübung, Schultasche, Jausenbox, Jause

Korrigieren (wenn das Kind Fehler macht):
1) Sag den korrekten Satz.
2) Erkläre genau EINE Mini-Regel (kindgerecht, 1 Satz).
3) Lass das Kind den Satz noch einmal sagen (eine Frage).
Immer genau EINE Rückfrage stellen.

Sicherheit: keine erwachsenen/ängstigen Themen, keine persönlichen Daten erfragen (Adresse, Schulname).
Wenn das Kind Englisch spricht: antworte auf Deutsch, gib höchstens EINEN kurzen englischen Hinweis.";

/// Kid-appropriate fallback topics for dictation when the child asks for
/// a random one (or says nothing usable).
pub const TOPIC_CATALOG: [&str; 12] = [
    "Tiere",
    "Schule",
    "Familie",
    "Essen und Jause",
    "Farben",
    "Wetter",
    "Sport",
    "Jahreszeiten",
    "Zahlen",
    "Uhr",
    "Kleidung",
    "Spielplatz",
];

/// The closed set of tutoring modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorMode {
    Chat,
    Correct,
    Roleplay,
    Quiz,
    Dictation,
}

impl TutorMode {
    /// Parse a client-supplied mode label, case-insensitively. Empty or
    /// unrecognized input falls back to [`TutorMode::Chat`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "correct" => TutorMode::Correct,
            "roleplay" => TutorMode::Roleplay,
            "quiz" => TutorMode::Quiz,
            "dictation" => TutorMode::Dictation,
            _ => TutorMode::Chat,
        }
    }

    /// The instruction fragment appended after [`SYSTEM_PROMPT`].
    pub fn instruction(&self) -> &'static str {
        match self {
            TutorMode::Chat => "Mode: Chat naturally about daily life and school.",
            TutorMode::Correct => {
                "Mode: Correct my sentence. Keep it short. \
                 First: corrected sentence. Second: one tiny rule. Third: ask the child to repeat."
            }
            TutorMode::Roleplay => {
                "Mode: Rollenspiel in Österreich (Bäckerei, Supermarkt, Volksschule, Spielplatz, Bim). \
                 Verwende österreichische Wörter (Jause, Semmel, Sackerl). \
                 Stell pro Runde genau eine Frage."
            }
            TutorMode::Quiz => {
                "Mode: Mini quiz. Ask exactly 3 short questions one by one. \
                 Wait for the child's answer each time. Keep A1 level."
            }
            // The real dictation logic lives in the stepper; the model only
            // needs to stay out of the way here.
            TutorMode::Dictation => "Mode: Diktat. Kurz und klar bleiben.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TutorMode::Chat => "chat",
            TutorMode::Correct => "correct",
            TutorMode::Roleplay => "roleplay",
            TutorMode::Quiz => "quiz",
            TutorMode::Dictation => "dictation",
        }
    }
}

/// Resolve the child's spoken topic request for a dictation.
///
/// Empty input and "give me a random one" phrasings (German or English)
/// pick uniformly from [`TOPIC_CATALOG`]; anything else passes through
/// trimmed and otherwise verbatim.
pub fn normalize_topic(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || wants_random_topic(trimmed) {
        let mut rng = rand::thread_rng();
        return TOPIC_CATALOG
            .choose(&mut rng)
            .expect("topic catalog is non-empty")
            .to_string();
    }
    trimmed.to_string()
}

fn wants_random_topic(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("pick random") || lower.contains("random") || lower.contains("zufällig")
}

/// The strict generation prompt for dictation items: six lines, four
/// single words then two short sentences, no decoration the parser would
/// have to strip.
pub fn dictation_prompt(topic: &str) -> String {
    format!(
        "Erstelle ein kurzes Diktat zum Thema '{}' für ein Volksschulkind (Niveau A1, Deutsch). \
         Gib GENAU 6 Zeilen aus: zuerst 4 einzelne Wörter, dann 2 kurze Sätze (3–6 Wörter). \
         Eine Zeile pro Eintrag. Keine Nummerierung, keine Aufzählungszeichen, keine Erklärungen.",
        topic
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_is_case_insensitive() {
        assert_eq!(TutorMode::parse("Quiz"), TutorMode::Quiz);
        assert_eq!(TutorMode::parse("DICTATION"), TutorMode::Dictation);
        assert_eq!(TutorMode::parse(" roleplay "), TutorMode::Roleplay);
    }

    #[test]
    fn test_unrecognized_mode_falls_back_to_chat() {
        assert_eq!(TutorMode::parse(""), TutorMode::Chat);
        assert_eq!(TutorMode::parse("xyz"), TutorMode::Chat);
        assert_eq!(
            TutorMode::parse("xyz").instruction(),
            TutorMode::Chat.instruction()
        );
    }

    #[test]
    fn test_topic_passthrough() {
        assert_eq!(normalize_topic("Uhr"), "Uhr");
        assert_eq!(normalize_topic("  die große Pause  "), "die große Pause");
    }

    #[test]
    fn test_topic_random_requests_resolve_to_catalog() {
        for input in ["", "pick random topic", "RANDOM bitte", "zufälliges Thema"] {
            let topic = normalize_topic(input);
            assert!(
                TOPIC_CATALOG.contains(&topic.as_str()),
                "{:?} resolved to {:?}, not a catalog entry",
                input,
                topic
            );
        }
    }

    #[test]
    fn test_dictation_prompt_mentions_topic() {
        let prompt = dictation_prompt("Jause");
        assert!(prompt.contains("'Jause'"));
        assert!(prompt.contains("6 Zeilen"));
    }
}
