//! Page handlers: the client page, the operator login form and logout.
//!
//! `GET /` serves the recording client only to an authenticated operator
//! and bounces everyone else to `/login`. Static assets themselves are
//! mounted separately under `/static`.

use crate::auth::{is_authenticated, AUTH_COOKIE};
use crate::error::AppError;
use crate::state::AppState;
use actix_files::NamedFile;
use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::{info, warn};

pub async fn index(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    if !is_authenticated(&req, &state.auth) {
        return Ok(redirect_to("/login"));
    }

    serve_page(&req, "static/index.html").await
}

pub async fn login_page(req: HttpRequest) -> Result<HttpResponse, AppError> {
    serve_page(&req, "static/login.html").await
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    if form.username != config.auth.username || form.password != config.auth.password {
        warn!(username = %form.username, "Rejected login attempt");
        return Err(AppError::Unauthorized(
            "Falscher Benutzername oder falsches Passwort.".to_string(),
        ));
    }

    let token = state.auth.issue();
    info!("Operator logged in");

    let cookie = Cookie::build(AUTH_COOKIE, token)
        .path("/")
        .http_only(true)
        .finish();

    let mut response = redirect_to("/");
    response
        .add_cookie(&cookie)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(response)
}

pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    if let Some(cookie) = req.cookie(AUTH_COOKIE) {
        state.auth.revoke(cookie.value());
    }

    let mut removal = Cookie::build(AUTH_COOKIE, "").path("/").finish();
    removal.make_removal();

    let mut response = redirect_to("/login");
    response
        .add_cookie(&removal)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(response)
}

fn redirect_to(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

async fn serve_page(req: &HttpRequest, path: &str) -> Result<HttpResponse, AppError> {
    let file = NamedFile::open_async(path)
        .await
        .map_err(|e| AppError::Internal(format!("Cannot serve {}: {}", path, e)))?;
    Ok(file.into_response(req))
}
