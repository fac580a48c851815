//! Webhook, admin and health routes.

mod admin;
mod webhooks;


use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use dispatch_ports::error::HandleError;
use dispatch_ports::inbound::{ContactReceiver, RosterAdmin};

use crate::config::Channels;

#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<dyn ContactReceiver>,
    pub roster: Arc<dyn RosterAdmin>,
    pub auth_token: Arc<str>,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

async fn require_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    request: Request,
    next: Next,
) -> Response {
    match query.token {
        Some(token) if *token == *state.auth_token => next.run(request).await,
        _ => {
            tracing::warn!(path = %request.uri().path(), "rejected request with bad token");
            (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "dispatch-relay",
    }))
}

fn status_for(err: &HandleError) -> StatusCode {
    match err {
        HandleError::Rejected(_) => StatusCode::BAD_REQUEST,
        HandleError::NotFound => StatusCode::NOT_FOUND,
        HandleError::Conflict(_) => StatusCode::CONFLICT,
        HandleError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
        HandleError::Timeout | HandleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Webhook failure, answered in plain text.
pub struct WebhookError(pub HandleError);

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let body = match self.0 {
            HandleError::Rejected(msg) => msg,
            HandleError::NotFound => "Not found".into(),
            HandleError::Conflict(msg) => msg,
            err => {
                tracing::error!(error = %err, "webhook failed");
                "Server error".into()
            }
        };
        (status, body).into_response()
    }
}

/// Admin API failure, answered as `{"error": ...}`.
pub struct AdminError(pub HandleError);

impl From<HandleError> for AdminError {
    fn from(err: HandleError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "admin request failed");
        }
        let message = match &self.0 {
            HandleError::Rejected(msg) | HandleError::Conflict(msg) => msg.clone(),
            HandleError::NotFound => "Not found".into(),
            _ => "Server error".into(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router(state: AppState, channels: Channels) -> Router {
    let mut hooks = Router::new();
    if channels.sms {
        tracing::info!("registering /sms route");
        hooks = hooks.route("/sms", post(webhooks::sms));
    }
    if channels.voice {
        tracing::info!("registering /voice and /voice-status routes");
        hooks = hooks
            .route("/voice", post(webhooks::voice))
            .route("/voice-status", post(webhooks::voice_status));
    }

    let protected = hooks
        .merge(admin::routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_token,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
}
