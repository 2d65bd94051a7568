//! Handler for `POST /reset`: drop a session's conversation history and
//! dictation state. Always succeeds; resetting an unknown id is a no-op.

use crate::auth::require_auth;
use crate::error::AppError;
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    #[serde(default)]
    pub session_id: String,
}

pub async fn reset(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<ResetRequest>,
) -> Result<HttpResponse, AppError> {
    require_auth(&req, &state)?;

    let session_id = body.session_id.trim();
    if !session_id.is_empty() {
        state.engine.reset(session_id);
    }

    Ok(HttpResponse::Ok().json(json!({ "status": "reset" })))
}
