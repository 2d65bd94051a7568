//! Handler for `POST /dictation/next`: advance the session's dictation by
//! one item and return it with synthesized audio.

use crate::auth::require_auth;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct DictationNextRequest {
    pub session_id: String,
}

pub async fn next(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<DictationNextRequest>,
) -> Result<HttpResponse, AppError> {
    require_auth(&req, &state)?;

    let step = state.engine.dictation_next(&body.session_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "session_id": step.session_id,
        "done": step.done,
        "status": step.status,
        "audio_b64": step.audio_b64,
        "reveal_text": step.reveal_text,
    })))
}
