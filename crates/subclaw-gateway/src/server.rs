//! HTTP server implementation using Axum.

use std::sync::Arc;

use axum::{Router, routing::get};
use subclaw_core::config::GatewayConfig;
use subclaw_lifecycle::CommandDispatcher;
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    /// Routes inbound chat messages; owns the lifecycle engine.
    pub dispatcher: Arc<CommandDispatcher>,
    /// Token Meta must echo during webhook verification.
    pub verify_token: String,
    /// Key for `X-Hub-Signature-256`; unsigned deliveries are refused.
    pub app_secret: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<CommandDispatcher>,
        verify_token: impl Into<String>,
        app_secret: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            verify_token: verify_token.into(),
            app_secret: app_secret.into(),
            start_time: std::time::Instant::now(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(super::routes::health_check))
        .route(
            "/webhook/whatsapp",
            get(super::routes::whatsapp_webhook_verify).post(super::routes::whatsapp_webhook),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until the process exits.
pub async fn start_server(config: &GatewayConfig, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
