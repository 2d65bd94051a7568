//! # Turn Orchestrator
//!
//! Coordinates one spoken turn end to end: upload validation, speech-to-
//! text, prompt shaping, chat completion, history update and speech
//! synthesis. Also drives the dictation branch (start + step) and the
//! session reset.
//!
//! ## Ordering Guarantees:
//! Store mutations happen only after every upstream call they depend on
//! has succeeded, so no error path leaves partial per-session state. The
//! one sanctioned exception is speech synthesis after a conversational
//! turn: when `behavior.tts_failure_fatal` is off (the default), a
//! synthesis failure degrades the response to an empty audio field
//! instead of discarding the already-stored turn.

use std::sync::{Arc, RwLock};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::providers::{ChatCompletion, ChatMessage, ProviderError, SpeechSynthesis, SpeechToText};
use crate::session::dictation::ITEM_COUNT;
use crate::session::{AdvanceOutcome, ConversationStore, DictationExercise, DictationStore};
use crate::tutor::modes::{self, TutorMode, SYSTEM_PROMPT};

/// Low temperature keeps generated dictation items terse and on-format.
const DICTATION_TEMPERATURE: f32 = 0.2;

/// Result of a `talk` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TalkOutcome {
    /// Dictation mode: the exercise is generated and waiting for the
    /// first step. No reply text, no reply audio, chat history untouched.
    DictationReady {
        session_id: String,
        topic: String,
        transcript: String,
    },

    /// A full conversational turn.
    Reply {
        session_id: String,
        transcript: String,
        reply: String,
        audio_b64: String,
    },
}

/// Result of a `dictation/next` invocation.
///
/// `reveal_text` is always populated for a revealed item; hiding it until
/// the learner asks is the client's job, it is not a server secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictationStep {
    pub session_id: String,
    pub done: bool,
    pub status: String,
    pub audio_b64: String,
    pub reveal_text: String,
}

/// Orchestrates turns against the two per-session stores and the three
/// upstream providers.
///
/// ## Thread Safety:
/// The engine is shared across request handlers behind an `Arc`. Store
/// mutations are atomic inside the stores themselves; no store lock is
/// held while any provider call is in flight.
pub struct TutorEngine {
    config: Arc<RwLock<AppConfig>>,
    transcriber: Arc<dyn SpeechToText>,
    chat: Arc<dyn ChatCompletion>,
    speech: Arc<dyn SpeechSynthesis>,
    conversations: ConversationStore,
    dictations: DictationStore,
}

impl TutorEngine {
    pub fn new(
        config: Arc<RwLock<AppConfig>>,
        transcriber: Arc<dyn SpeechToText>,
        chat: Arc<dyn ChatCompletion>,
        speech: Arc<dyn SpeechSynthesis>,
    ) -> Self {
        let max_turns = config.read().unwrap().limits.max_turns;
        Self {
            config,
            transcriber,
            chat,
            speech,
            conversations: ConversationStore::new(max_turns),
            dictations: DictationStore::new(),
        }
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn dictations(&self) -> &DictationStore {
        &self.dictations
    }

    /// Process one spoken turn.
    ///
    /// A missing or empty session id gets a freshly generated one, echoed
    /// back so the client can reuse it. In dictation mode the transcript
    /// is treated as the topic request and the conversation store is not
    /// touched.
    pub async fn talk(
        &self,
        session_id: Option<String>,
        mode_raw: &str,
        audio: Vec<u8>,
        filename: &str,
    ) -> AppResult<TalkOutcome> {
        let (min_audio_bytes, chat_temperature, tts_failure_fatal) = {
            let config = self.config.read().unwrap();
            (
                config.limits.min_audio_bytes,
                config.openai.chat_temperature,
                config.behavior.tts_failure_fatal,
            )
        };

        if audio.len() < min_audio_bytes {
            return Err(AppError::BadRequest(
                "Audio too short/empty. Bitte etwas länger sprechen und noch einmal probieren."
                    .to_string(),
            ));
        }

        let session_id = match session_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => id,
            None => Uuid::new_v4().to_string(),
        };

        let transcript = self
            .transcriber
            .transcribe(audio, filename)
            .await
            .map_err(transcription_error)?;
        let user_text = transcript.trim().to_string();

        let mode = TutorMode::parse(mode_raw);
        info!(%session_id, mode = mode.as_str(), transcript_chars = user_text.len(), "Turn transcribed");

        if mode == TutorMode::Dictation {
            return self.start_dictation(session_id, user_text).await;
        }

        let history = self.conversations.history(&session_id);
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(format!(
            "{}\n{}",
            SYSTEM_PROMPT,
            mode.instruction()
        )));
        messages.extend(history);
        messages.push(ChatMessage::user(user_text.clone()));

        let reply = self
            .chat
            .complete(&messages, chat_temperature)
            .await
            .map_err(|e| AppError::Upstream(format!("Chat completion failed: {}", e)))?;
        let reply_text = reply.trim().to_string();

        self.conversations
            .append_exchange(&session_id, &user_text, &reply_text);

        let audio_b64 = match self.speech.synthesize(&reply_text).await {
            Ok(bytes) => BASE64.encode(bytes),
            Err(e) if !tts_failure_fatal => {
                warn!(%session_id, error = %e, "Speech synthesis failed, returning text-only reply");
                String::new()
            }
            Err(e) => {
                return Err(AppError::Upstream(format!(
                    "Speech synthesis failed: {}",
                    e
                )))
            }
        };

        Ok(TalkOutcome::Reply {
            session_id,
            transcript: user_text,
            reply: reply_text,
            audio_b64,
        })
    }

    /// Generate a fresh dictation exercise from the spoken topic request,
    /// replacing any prior exercise for the session.
    async fn start_dictation(
        &self,
        session_id: String,
        topic_request: String,
    ) -> AppResult<TalkOutcome> {
        let topic = modes::normalize_topic(&topic_request);

        let prompt = vec![ChatMessage::user(modes::dictation_prompt(&topic))];
        let raw_items = self
            .chat
            .complete(&prompt, DICTATION_TEMPERATURE)
            .await
            .map_err(|e| AppError::Upstream(format!("Dictation generation failed: {}", e)))?;

        self.dictations
            .start(&session_id, DictationExercise::new(topic.clone(), &raw_items));
        info!(%session_id, %topic, "Dictation started");

        Ok(TalkOutcome::DictationReady {
            session_id,
            topic,
            transcript: topic_request,
        })
    }

    /// Advance the session's dictation by one item and synthesize it.
    ///
    /// Past the last item this is an idempotent terminal read: done stays
    /// true, the cursor stays put and nothing is synthesized. A synthesis
    /// failure mid-exercise degrades to an empty audio field; the learner
    /// still has the reveal text, and failing here would desync the
    /// already-advanced cursor from the response.
    pub async fn dictation_next(&self, session_id: &str) -> AppResult<DictationStep> {
        match self.dictations.advance(session_id) {
            AdvanceOutcome::NotStarted => Err(AppError::BadRequest(
                "Kein Diktat gestartet. Bitte zuerst im Diktat-Modus ein Thema sagen.".to_string(),
            )),
            AdvanceOutcome::AlreadyComplete => Ok(DictationStep {
                session_id: session_id.to_string(),
                done: true,
                status: "Diktat ist fertig. Starte ein neues, wenn du magst!".to_string(),
                audio_b64: String::new(),
                reveal_text: String::new(),
            }),
            AdvanceOutcome::Revealed { index, text, done } => {
                let audio_b64 = match self.speech.synthesize(&text).await {
                    Ok(bytes) => BASE64.encode(bytes),
                    Err(e) => {
                        warn!(%session_id, error = %e, "Dictation synthesis failed, sending text only");
                        String::new()
                    }
                };

                let status = if done {
                    "Diktat fertig! Das war der letzte Eintrag.".to_string()
                } else {
                    format!("Eintrag {} von {}", index + 1, ITEM_COUNT)
                };

                Ok(DictationStep {
                    session_id: session_id.to_string(),
                    done,
                    status,
                    audio_b64,
                    reveal_text: text,
                })
            }
        }
    }

    /// Clear both stores for the session. Idempotent; unknown ids succeed.
    pub fn reset(&self, session_id: &str) {
        let had_history = self.conversations.remove(session_id);
        let had_dictation = self.dictations.remove(session_id);
        info!(%session_id, had_history, had_dictation, "Session reset");
    }
}

fn transcription_error(err: ProviderError) -> AppError {
    match err {
        ProviderError::NotConfigured(msg) => AppError::Internal(msg),
        other => AppError::BadRequest(format!("Transcription failed: {}", other)),
    }
}
