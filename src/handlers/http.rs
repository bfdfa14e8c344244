//! HTTP handlers: channel auth and health.

use axum::{extract::State, http::StatusCode, Form, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::AuthResponse;
use crate::error::{AppError, AppResult};
use crate::models::channel::ChannelType;
use crate::services::{ChannelSigner, SignError};

/// Shared state for the auth endpoint.
#[derive(Clone)]
pub struct AppState {
    pub signer: ChannelSigner,
}

impl AppState {
    pub fn signer(&self) -> &ChannelSigner {
        &self.signer
    }
}

/// Form body posted by a client's auth request builder.
#[derive(Debug, Deserialize)]
pub struct AuthForm {
    pub socket_id: String,
    pub channel_name: String,
    /// Presence member info. A real application derives this from its own session.
    #[serde(default)]
    pub channel_data: Option<String>,
}

/// POST /pusher/auth — sign a private or presence subscription attempt.
pub async fn channel_auth(
    State(state): State<AppState>,
    Form(form): Form<AuthForm>,
) -> AppResult<Json<AuthResponse>> {
    if form.socket_id.is_empty() || form.channel_name.is_empty() {
        return Err(AppError::Validation(
            "socket_id and channel_name are required".to_string(),
        ));
    }

    let channel_type = ChannelType::from_name(&form.channel_name);
    if !channel_type.is_private() {
        debug!(channel = %form.channel_name, "auth requested for public channel");
        return Err(AppError::Validation(format!(
            "{} does not need authorization",
            form.channel_name
        )));
    }

    let channel_data = match channel_type {
        ChannelType::Presence => form.channel_data.clone(),
        _ => None,
    };
    if let Some(data) = channel_data.as_deref() {
        let parsed: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| AppError::Validation(format!("channel_data is not JSON: {}", e)))?;
        if parsed.get("user_id").is_none() {
            return Err(AppError::Validation(
                "channel_data must contain user_id".to_string(),
            ));
        }
    }

    let auth = state
        .signer()
        .auth_token(&form.socket_id, &form.channel_name, channel_data.as_deref())
        .map_err(|e| match e {
            SignError::MissingChannelData => AppError::Validation(e.to_string()),
            SignError::InvalidSecret => AppError::Internal(anyhow::anyhow!(e)),
            _ => AppError::Auth(e.to_string()),
        })?;

    info!(socket_id = %form.socket_id, channel = %form.channel_name, "subscription signed");
    Ok(Json(AuthResponse { auth, channel_data }))
}

/// GET /health — liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "notif-auth" })),
    )
}
