// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Signed webhook endpoint.
//!
//! Canva delivers webhook notifications as HMAC-signed POSTs. The response
//! uses Canva's discriminator shape: `{"type": "SUCCESS"}` on acceptance,
//! `{"type": "FAIL", "message": …}` with a 401 on rejection.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::orchestrator;
use crate::state::AppState;

/// Webhook acknowledgement in Canva's discriminator shape.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookResponse {
    fn success() -> Self {
        Self {
            kind: "SUCCESS",
            message: None,
        }
    }

    fn fail(message: String) -> Self {
        Self {
            kind: "FAIL",
            message: Some(message),
        }
    }
}

/// Webhook delivery handler.
///
/// Registered for every method so that a wrong verb is rejected by the
/// verification pipeline rather than by the router.
#[utoipa::path(
    post,
    path = "/hook",
    tag = "Webhook",
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Webhook accepted", body = WebhookResponse),
        (status = 401, description = "Request failed verification", body = WebhookResponse)
    )
)]
pub async fn hook(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookResponse>) {
    let verdict = orchestrator::verify_signed_post(
        &method,
        &headers,
        uri.path(),
        &body,
        &state.config.signing_secret,
        Utc::now().timestamp(),
    );

    match verdict {
        Ok(()) => {
            info!(path = %uri.path(), "accepted signed webhook");
            (StatusCode::OK, Json(WebhookResponse::success()))
        }
        Err(e) => {
            info!(code = e.error_code(), "rejected webhook delivery");
            (
                StatusCode::UNAUTHORIZED,
                Json(WebhookResponse::fail(e.to_string())),
            )
        }
    }
}
