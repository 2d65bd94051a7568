//! # DeutschCoach Backend - Main Application Entry Point
//!
//! Actix-web server for a voice-based German tutoring assistant aimed at
//! primary-school beginners. A spoken clip goes in; a transcript, a
//! persona-shaped reply and synthesized speech come back. Short-lived
//! per-session conversation memory and a small dictation exercise state
//! machine live in process memory.
//!
//! ## Application Architecture:
//! - **config**: layered configuration (TOML file + environment variables)
//! - **state**: shared application state and counters
//! - **auth**: single-operator login gating every stateful endpoint
//! - **session**: conversation window + dictation stores, keyed by session id
//! - **tutor**: modes, persona prompt and the turn orchestrator
//! - **providers**: OpenAI speech-to-text, chat and text-to-speech clients
//! - **handlers**: HTTP request handlers
//! - **middleware**: request logging and counters
//! - **error**: error types and HTTP error responses

mod auth;
mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod providers;
mod session;
mod state;
mod tutor;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use crate::config::AppConfig;
use providers::{OpenAiChatCompletion, OpenAiSpeechSynthesis, OpenAiTranscription};
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutor::TutorEngine;

/// Global shutdown signal, set by the signal handler task and polled by
/// the main task to stop the server gracefully.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting deutsch-coach-backend v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded: {}:{}", config.server.host, config.server.port);
    if config.openai.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; upstream calls will fail until it is provided");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let shared_config = Arc::new(RwLock::new(config.clone()));

    let engine = Arc::new(TutorEngine::new(
        shared_config.clone(),
        Arc::new(OpenAiTranscription::new(&config.openai)?),
        Arc::new(OpenAiChatCompletion::new(&config.openai)?),
        Arc::new(OpenAiSpeechSynthesis::new(&config.openai)?),
    ));

    let app_state = AppState::new(shared_config, engine);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(middleware::RequestLogging)
            .route("/talk", web::post().to(handlers::talk::talk))
            .route("/dictation/next", web::post().to(handlers::dictation::next))
            .route("/reset", web::post().to(handlers::session::reset))
            .route("/health", web::get().to(health::health_check))
            .route("/", web::get().to(handlers::pages::index))
            .route("/login", web::get().to(handlers::pages::login_page))
            .route("/login", web::post().to(handlers::pages::login))
            .route("/logout", web::get().to(handlers::pages::logout))
            .service(actix_files::Files::new("/static", "static"))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "deutsch_coach_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Listen for SIGTERM/SIGINT and flip the shutdown flag so in-flight
/// requests can finish before the server stops.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
