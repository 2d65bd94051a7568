//! # Application State Management
//!
//! Shared state every HTTP request handler can reach through
//! `web::Data<AppState>`. All mutable pieces sit behind `Arc` so the
//! cheap `Clone` actix requires shares one instance instead of copying.
//!
//! ## Thread Safety:
//! - Configuration uses `Arc<RwLock<AppConfig>>`: many concurrent readers,
//!   exclusive writers.
//! - The tutoring engine owns the per-session stores and serializes their
//!   mutations internally.
//! - Counters take a short exclusive write per request.

use crate::auth::AuthTokens;
use crate::config::AppConfig;
use crate::tutor::TutorEngine;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<RwLock<AppConfig>>,

    /// Turn orchestrator owning the session and dictation stores
    pub engine: Arc<TutorEngine>,

    /// Registry of valid operator tokens
    pub auth: AuthTokens,

    /// Request/error counters for the health endpoint
    metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of error responses since server start
    pub error_count: u64,
}

impl AppState {
    pub fn new(config: Arc<RwLock<AppConfig>>, engine: Arc<TutorEngine>) -> Self {
        Self {
            config,
            engine,
            auth: AuthTokens::new(),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Copy of the current configuration; cloning releases the lock
    /// immediately so other requests aren't blocked.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Count one finished request (called by the logging middleware).
    pub fn record_request(&self, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
        if is_error {
            metrics.error_count += 1;
        }
    }

    pub fn metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap().clone()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        ChatCompletion, ChatMessage, ProviderError, SpeechSynthesis, SpeechToText,
    };
    use async_trait::async_trait;

    struct NoopProvider;

    #[async_trait]
    impl SpeechToText for NoopProvider {
        async fn transcribe(&self, _audio: Vec<u8>, _filename: &str) -> Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    #[async_trait]
    impl ChatCompletion for NoopProvider {
        async fn complete(
            &self,
            _messages: &[ChatMessage],
            _temperature: f32,
        ) -> Result<String, ProviderError> {
            Ok(String::new())
        }
    }

    #[async_trait]
    impl SpeechSynthesis for NoopProvider {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn test_state() -> AppState {
        let config = Arc::new(RwLock::new(AppConfig::default()));
        let engine = Arc::new(TutorEngine::new(
            config.clone(),
            Arc::new(NoopProvider),
            Arc::new(NoopProvider),
            Arc::new(NoopProvider),
        ));
        AppState::new(config, engine)
    }

    #[test]
    fn test_counters_accumulate() {
        let state = test_state();
        state.record_request(false);
        state.record_request(true);
        state.record_request(false);

        let metrics = state.metrics_snapshot();
        assert_eq!(metrics.request_count, 3);
        assert_eq!(metrics.error_count, 1);
    }

    #[test]
    fn test_config_snapshot_is_detached() {
        let state = test_state();
        let snapshot = state.get_config();
        assert_eq!(snapshot.limits.max_turns, 6);
    }
}
