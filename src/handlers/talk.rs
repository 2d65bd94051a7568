//! Handler for `POST /talk`, the main conversational turn endpoint.
//!
//! Accepts a multipart form with a required `audio` part and optional
//! `mode` and `session_id` text parts, runs it through the turn
//! orchestrator and answers with either a full reply (transcript, reply
//! text, base64 audio) or a dictation-ready acknowledgment.

use crate::auth::require_auth;
use crate::error::AppError;
use crate::state::AppState;
use crate::tutor::TalkOutcome;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde_json::json;
use tracing::info;

/// The parsed multipart form.
struct TalkForm {
    audio: Vec<u8>,
    filename: String,
    mode: String,
    session_id: Option<String>,
}

pub async fn talk(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: actix_multipart::Multipart,
) -> Result<HttpResponse, AppError> {
    // Auth is checked before the upload is even read; a rejected caller
    // must not cause any work or state change.
    require_auth(&req, &state)?;

    let form = read_talk_form(payload).await?;

    let outcome = state
        .engine
        .talk(form.session_id, &form.mode, form.audio, &form.filename)
        .await?;

    let body = match outcome {
        TalkOutcome::DictationReady {
            session_id,
            topic,
            transcript,
        } => json!({
            "session_id": session_id,
            "dictation_ready": true,
            "topic": topic,
            "status": format!("Diktat zum Thema '{}' ist bereit. Hol dir das erste Wort!", topic),
            "transcript": transcript,
        }),
        TalkOutcome::Reply {
            session_id,
            transcript,
            reply,
            audio_b64,
        } => json!({
            "session_id": session_id,
            "transcript": transcript,
            "reply": reply,
            "audio_b64": audio_b64,
        }),
    };

    Ok(HttpResponse::Ok().json(body))
}

/// Pull the audio bytes and text fields out of the multipart payload.
async fn read_talk_form(mut payload: actix_multipart::Multipart) -> Result<TalkForm, AppError> {
    let mut audio: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut mode = String::from("chat");
    let mut session_id: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .ok_or_else(|| AppError::BadRequest("Missing multipart field name".to_string()))?
            .to_string();

        match field_name.as_str() {
            "audio" => {
                filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(|s| s.to_string());
                content_type = field.content_type().map(|m| m.to_string());

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk =
                        chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
                    bytes.extend_from_slice(&chunk);
                }
                audio = Some(bytes);
            }
            "mode" => {
                mode = read_text_field(&mut field).await?;
            }
            "session_id" => {
                let value = read_text_field(&mut field).await?;
                if !value.trim().is_empty() {
                    session_id = Some(value.trim().to_string());
                }
            }
            _ => {
                // Drain unknown fields so the stream stays consumable.
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
                }
            }
        }
    }

    let audio = audio
        .ok_or_else(|| AppError::BadRequest("No audio file provided".to_string()))?;
    let filename = filename.unwrap_or_else(|| "speech.webm".to_string());

    info!(
        filename = %filename,
        content_type = %content_type.as_deref().unwrap_or("unknown"),
        bytes = audio.len(),
        "Audio upload received"
    );

    Ok(TalkForm {
        audio,
        filename,
        mode,
        session_id,
    })
}

async fn read_text_field(field: &mut actix_multipart::Field) -> Result<String, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8(bytes)
        .map_err(|_| AppError::BadRequest("Form field is not valid UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AUTH_COOKIE;
    use crate::config::AppConfig;
    use crate::providers::{
        ChatCompletion, ChatMessage, ProviderError, SpeechSynthesis, SpeechToText,
    };
    use crate::tutor::TutorEngine;
    use actix_web::cookie::Cookie;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::sync::{Arc, RwLock};

    struct CannedProviders;

    #[async_trait]
    impl SpeechToText for CannedProviders {
        async fn transcribe(&self, _audio: Vec<u8>, _filename: &str) -> Result<String, ProviderError> {
            Ok("Ich mag Palatschinken.".to_string())
        }
    }

    #[async_trait]
    impl ChatCompletion for CannedProviders {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
        ) -> Result<String, ProviderError> {
            Ok("Leiwand! Magst du sie mit Topfen?".to_string())
        }
    }

    #[async_trait]
    impl SpeechSynthesis for CannedProviders {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ProviderError> {
            Ok(vec![1, 2, 3])
        }
    }

    fn test_state() -> AppState {
        let config = Arc::new(RwLock::new(AppConfig::default()));
        let engine = Arc::new(TutorEngine::new(
            config.clone(),
            Arc::new(CannedProviders),
            Arc::new(CannedProviders),
            Arc::new(CannedProviders),
        ));
        AppState::new(config, engine)
    }

    fn multipart_request(audio_len: usize) -> (String, Vec<u8>) {
        let boundary = "----coach-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"audio\"; \
                 filename=\"speech.webm\"\r\nContent-Type: audio/webm\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&vec![0u8; audio_len]);
        body.extend_from_slice(
            format!(
                "\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"mode\"\r\n\r\nchat\r\n--{boundary}--\r\n"
            )
            .as_bytes(),
        );
        (
            format!("multipart/form-data; boundary={boundary}"),
            body,
        )
    }

    #[actix_web::test]
    async fn test_unauthenticated_talk_is_rejected_without_state() {
        let state = test_state();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/talk", web::post().to(talk)),
        )
        .await;

        let (content_type, body) = multipart_request(600);
        let req = test::TestRequest::post()
            .uri("/talk")
            .insert_header(("Content-Type", content_type))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
        assert_eq!(state.engine.conversations().session_count(), 0);
        assert_eq!(state.engine.dictations().exercise_count(), 0);
    }

    #[actix_web::test]
    async fn test_authenticated_talk_returns_full_turn() {
        let state = test_state();
        let token = state.auth.issue();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/talk", web::post().to(talk)),
        )
        .await;

        let (content_type, body) = multipart_request(600);
        let req = test::TestRequest::post()
            .uri("/talk")
            .insert_header(("Content-Type", content_type))
            .cookie(Cookie::new(AUTH_COOKIE, token))
            .set_payload(body)
            .to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["transcript"], "Ich mag Palatschinken.");
        assert_eq!(body["reply"], "Leiwand! Magst du sie mit Topfen?");
        assert!(!body["audio_b64"].as_str().unwrap().is_empty());
        let session_id = body["session_id"].as_str().unwrap();
        assert_eq!(state.engine.conversations().history(session_id).len(), 2);
    }
}
