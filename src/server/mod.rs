//! HTTP server for takeaways
//!
//! Exposes the extraction pipeline at `POST /process` plus a few read routes
//! over stored meetings. Everything except `/` and `/health` sits behind the
//! bearer token check.

mod auth;
pub mod envelope;
mod error;
mod handlers;

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::extraction::Extractor;
use crate::storage::Repository;

pub use envelope::{ProcessRequest, ProcessedResponse, ResponseMetadata};
pub use error::ApiError;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,

    /// Present when meetings are persisted
    pub repository: Option<Arc<Mutex<Repository>>>,

    /// Required bearer token; `None` disables auth
    pub api_token: Option<String>,

    /// Source tag reported in response metadata
    pub source: String,
}

impl AppState {
    pub fn new(extractor: Extractor, repository: Option<Repository>, settings: &Settings) -> Self {
        Self {
            extractor: Arc::new(extractor),
            repository: repository.map(|repo| Arc::new(Mutex::new(repo))),
            api_token: settings.api_token().map(str::to_string),
            source: settings.server.source_name.clone(),
        }
    }

    /// `DATABASE` when meetings are stored, `LLM_ONLY` otherwise
    pub fn mode(&self) -> &'static str {
        if self.repository.is_some() {
            "DATABASE"
        } else {
            "LLM_ONLY"
        }
    }

    fn repository(&self) -> Result<&Arc<Mutex<Repository>>, ApiError> {
        self.repository.as_ref().ok_or(ApiError::PersistenceDisabled)
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/process", post(handlers::process))
        .route("/meetings", get(handlers::list_meetings))
        .route("/meetings/:id", get(handlers::get_meeting))
        .route("/actions/:id/complete", post(handlers::complete_action))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    let public = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health));

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// CORS policy for the configured origins; `*` allows any origin.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin.trim() == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Run the HTTP server until interrupted
pub async fn run(settings: &Settings, bind: Option<String>) -> Result<()> {
    let extractor = Extractor::from_settings(settings)?;

    let repository = if settings.general.persist {
        Some(Repository::new(settings)?)
    } else {
        info!("Persistence disabled; meetings will not be stored");
        None
    };

    let state = AppState::new(extractor, repository, settings);
    if state.api_token.is_none() {
        warn!("No API token configured; protected routes accept any request");
    }
    info!(
        "Mode: {}, model: {}",
        state.mode(),
        state.extractor.model()
    );

    let app = build_router(state).layer(cors_layer(&settings.server.cors_origins));

    let addr = bind.unwrap_or_else(|| settings.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
