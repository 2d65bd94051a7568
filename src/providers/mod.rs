//! Upstream model-service abstraction layer.
//!
//! The tutoring engine only talks to speech and language models through the
//! three traits below, so tests can substitute in-memory fakes and another
//! vendor can be slotted in without touching the orchestration code.

mod openai;

pub use openai::{OpenAiChatCompletion, OpenAiSpeechSynthesis, OpenAiTranscription};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One message in a chat-completion conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat roles as the wire format expects them (lowercase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Failures surfaced by any provider call.
#[derive(Debug)]
pub enum ProviderError {
    /// The provider is missing required configuration (typically the API key)
    NotConfigured(String),

    /// The request could not be sent or the response could not be read
    Request(String),

    /// The remote API answered with a non-success status
    Api { status: u16, message: String },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NotConfigured(msg) => write!(f, "provider not configured: {}", msg),
            ProviderError::Request(msg) => write!(f, "request failed: {}", msg),
            ProviderError::Api { status, message } => {
                write!(f, "API error {}: {}", status, message)
            }
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Request(err.to_string())
    }
}

/// Speech-to-text: turn an uploaded audio clip into a transcript.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, ProviderError>;
}

/// Chat completion: produce the assistant's next message for a conversation.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ProviderError>;
}

/// Text-to-speech: render a reply as audio bytes (MP3).
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_wire_format() {
        let msg = ChatMessage::assistant("Servus!");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"assistant""#));

        let back: ChatMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        assert!(err.to_string().contains("429"));
    }
}
