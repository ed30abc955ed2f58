//! HTTP API server implementation
//!
//! Serves the answer-and-reflect workflow over Axum.

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use super::routes::{chat_with_score, chat_with_score_reflect_and_reason, health_check, root};
use crate::config::ApiConfig;
use crate::workflow::ReflectionWorkflow;

/// Errors starting or running the server
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    #[error("Failed to bind to {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("Server error: {0}")]
    Serve(String),
}

/// HTTP API Server configuration
#[derive(Debug, Clone)]
pub struct HttpApiConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
    /// Allowed CORS origins; `*` is permissive, empty disables CORS
    pub cors_origins: Vec<String>,
    /// Enable request tracing
    pub enable_tracing: bool,
}

impl Default for HttpApiConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

impl From<&ApiConfig> for HttpApiConfig {
    fn from(api: &ApiConfig) -> Self {
        Self {
            bind_address: api.host.clone(),
            port: api.port,
            cors_origins: api.cors_origins.clone(),
            enable_tracing: api.enable_tracing,
        }
    }
}

/// HTTP API Server
pub struct HttpApiServer {
    config: HttpApiConfig,
    workflow: Arc<ReflectionWorkflow>,
}

impl HttpApiServer {
    /// Create a new HTTP API server instance
    pub fn new(config: HttpApiConfig, workflow: Arc<ReflectionWorkflow>) -> Self {
        Self { config, workflow }
    }

    /// Start the server and run until Ctrl-C.
    pub async fn start(&self) -> Result<(), ApiServerError> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApiServerError::Bind {
                addr: addr.clone(),
                message: e.to_string(),
            })?;

        tracing::info!("HTTP API server starting on {}", addr);
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), ApiServerError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ApiServerError::Serve(e.to_string()))?;

        tracing::info!("HTTP API server stopped");
        Ok(())
    }

    /// Create the Axum router with all routes and middleware
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/", get(root))
            .route("/api/record/health", get(health_check))
            .route("/api/chat/chat_with_score", post(chat_with_score))
            .route(
                "/api/chat/chat_with_score_reflect_and_reason",
                post(chat_with_score_reflect_and_reason),
            )
            .with_state(self.workflow.clone());

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        if let Some(cors) = cors_layer(&self.config.cors_origins) {
            router = router.layer(cors);
        }

        router
    }
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    if origins.iter().any(|o| o == "*") {
        return Some(CorsLayer::permissive());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any),
    )
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
