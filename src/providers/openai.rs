//! OpenAI implementations of the speech and chat provider traits.
//!
//! Three thin `reqwest` clients against the v1 REST surface: multipart
//! upload for transcription, JSON body for chat completions, raw bytes
//! back from speech synthesis. Every request is bounded by the configured
//! timeout so a stalled upstream cannot pin a turn forever.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::config::OpenAiConfig;
use crate::providers::{
    ChatCompletion, ChatMessage, ProviderError, SpeechSynthesis, SpeechToText,
};

fn build_client(timeout_secs: u64) -> anyhow::Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

fn guess_audio_mime(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("webm") => "audio/webm",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

async fn api_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    error!(status, %message, "OpenAI API error");
    ProviderError::Api { status, message }
}

/// Speech-to-text via the `/audio/transcriptions` endpoint.
pub struct OpenAiTranscription {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl OpenAiTranscription {
    pub fn new(config: &OpenAiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            model: config.transcribe_model.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait]
impl SpeechToText for OpenAiTranscription {
    async fn transcribe(&self, audio: Vec<u8>, filename: &str) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;

        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(guess_audio_mime(filename))
            .map_err(|e| ProviderError::Request(format!("Failed to create form part: {e}")))?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        debug!(model = %self.model, "Sending transcription request");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.api_base))
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: TranscriptionResponse = response.json().await?;
        Ok(body.text)
    }
}

/// Chat completion via the `/chat/completions` endpoint.
pub struct OpenAiChatCompletion {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl OpenAiChatCompletion {
    pub fn new(config: &OpenAiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            model: config.chat_model.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl ChatCompletion for OpenAiChatCompletion {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key()?;

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };

        debug!(model = %self.model, message_count = messages.len(), "Sending chat request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: ChatResponse = response.json().await?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Request("No completion returned".to_string()))
    }
}

/// Text-to-speech via the `/audio/speech` endpoint.
pub struct OpenAiSpeechSynthesis {
    client: Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    voice: String,
}

impl OpenAiSpeechSynthesis {
    pub fn new(config: &OpenAiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout_secs)?,
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
            model: config.tts_model.clone(),
            voice: config.voice.clone(),
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OpenAI API key not set".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
}

#[async_trait]
impl SpeechSynthesis for OpenAiSpeechSynthesis {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let api_key = self.api_key()?;

        let request = SpeechRequest {
            model: &self.model,
            voice: &self.voice,
            input: text,
        };

        debug!(model = %self.model, voice = %self.voice, "Sending speech request");

        let response = self
            .client
            .post(format!("{}/audio/speech", self.api_base))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_audio_mime() {
        assert_eq!(guess_audio_mime("speech.webm"), "audio/webm");
        assert_eq!(guess_audio_mime("take2.mp3"), "audio/mpeg");
        assert_eq!(guess_audio_mime("noextension"), "application/octet-stream");
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let config = OpenAiConfig {
            api_key: None,
            ..crate::config::AppConfig::default().openai
        };
        let provider = OpenAiTranscription::new(&config).unwrap();
        assert!(matches!(
            provider.api_key(),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_chat_request_serialization() {
        let messages = vec![ChatMessage::system("persona"), ChatMessage::user("Hallo")];
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.4,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""role":"system""#));
        assert!(json.contains(r#""temperature":0.4"#));
    }
}
