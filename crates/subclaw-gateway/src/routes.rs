//! API route handlers for the gateway.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use subclaw_channels::parse_webhook_payload;

use super::server::AppState;
use super::signature::{SIGNATURE_HEADER, verify_signature};

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let lifecycle = state.dispatcher.lifecycle();
    Json(serde_json::json!({
        "status": "ok",
        "records": lifecycle.cache().len(),
        "busy": lifecycle.gate().is_busy(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// WhatsApp webhook verification (GET) — Meta sends this to verify the endpoint.
pub async fn whatsapp_webhook_verify(
    Query(params): Query<HashMap<String, String>>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str).unwrap_or("");
    let token = params.get("hub.verify_token").map(String::as_str).unwrap_or("");
    let challenge = params.get("hub.challenge").cloned().unwrap_or_default();

    if mode == "subscribe" && !state.verify_token.is_empty() && token == state.verify_token {
        tracing::info!("✅ WhatsApp webhook verified");
        (StatusCode::OK, challenge).into_response()
    } else {
        tracing::warn!("⚠️ WhatsApp webhook verification rejected (mode={})", mode);
        (StatusCode::FORBIDDEN, "Forbidden").into_response()
    }
}

/// WhatsApp webhook handler (POST). The body must carry a valid
/// `X-Hub-Signature-256`; anything else is refused before parsing. Meta wants
/// a quick 200, so every message is handled on its own task.
pub async fn whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !verify_signature(&state.app_secret, &body, signature) {
        tracing::warn!("⚠️ [whatsapp] Rejected webhook with missing or invalid signature");
        return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("⚠️ [whatsapp] Invalid webhook JSON: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON").into_response();
        }
    };

    for msg in parse_webhook_payload(&payload) {
        tracing::info!("[whatsapp] Message from {}", msg.from);
        let dispatcher = state.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.handle(msg).await;
        });
    }
    Json(serde_json::json!({"status": "ok"})).into_response()
}
