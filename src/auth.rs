//! # Operator Authentication
//!
//! One shared operator credential gates every stateful endpoint except
//! the login/logout surface. A successful login registers an opaque UUID
//! token in an in-process set and hands it to the browser as an HttpOnly
//! cookie; possession of a registered token IS the authentication
//! predicate. Tokens live until logout or process restart, the same
//! lifetime as the session stores they protect.

use crate::error::AppError;
use crate::state::AppState;
use actix_web::HttpRequest;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Cookie carrying the operator token.
pub const AUTH_COOKIE: &str = "coach_auth";

/// In-process registry of valid operator tokens.
#[derive(Clone, Default)]
pub struct AuthTokens {
    tokens: Arc<RwLock<HashSet<String>>>,
}

impl AuthTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint and register a fresh token.
    pub fn issue(&self) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.write().unwrap().insert(token.clone());
        token
    }

    /// Invalidate a token. Unknown tokens are a no-op.
    pub fn revoke(&self, token: &str) -> bool {
        self.tokens.write().unwrap().remove(token)
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.tokens.read().unwrap().contains(token)
    }
}

/// The authentication predicate consumed by protected handlers.
pub fn is_authenticated(req: &HttpRequest, tokens: &AuthTokens) -> bool {
    req.cookie(AUTH_COOKIE)
        .map(|cookie| tokens.is_valid(cookie.value()))
        .unwrap_or(false)
}

/// Guard for protected endpoints: pass or fail before any store is
/// touched, so auth failures never leave partial state.
pub fn require_auth(req: &HttpRequest, state: &AppState) -> Result<(), AppError> {
    if is_authenticated(req, &state.auth) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "Login required. Bitte zuerst anmelden.".to_string(),
        ))
    }
}
