// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Account-linking handshake endpoints.
//!
//! Linking a Pulse account to a Canva user is an OAuth-style round trip:
//!
//! 1. `/configuration/start` mints a nonce, stores it in a signed cookie,
//!    and sends the browser to Canva's authorization page with the same
//!    nonce and the caller's opaque `state` in the query string.
//! 2. Canva sends the browser back to `/configuration/redirect` with a
//!    signed query string, the nonce, and a user token. The handler verifies
//!    the signature (hard 401 on mismatch), then the nonce handshake and the
//!    token; those failures degrade to a redirect carrying an error code so
//!    the browser always lands back on Canva's configured page.
//!
//! The nonce cookie is cleared on every redirect response, success or not.

use axum::{
    extract::{Query, State},
    http::{
        header::{COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, Method, StatusCode,
    },
    response::{AppendHeaders, IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::auth::error::AuthError;
use crate::auth::nonce::{self, NONCE_COOKIE};
use crate::auth::orchestrator::{self, RedirectParams};
use crate::auth::verifier;
use crate::state::AppState;

/// Query parameters of the linking start endpoint.
#[derive(Debug, Deserialize)]
pub struct StartParams {
    /// Opaque Canva state, echoed back at the end of the flow.
    #[serde(default)]
    pub state: String,
}

fn redirect_to(location: String, set_cookie: String) -> Response {
    (
        StatusCode::FOUND,
        AppendHeaders([(SET_COOKIE, set_cookie), (LOCATION, location)]),
    )
        .into_response()
}

/// Start the linking flow: mint the nonce and bounce to Canva.
#[utoipa::path(
    get,
    path = "/configuration/start",
    tag = "Linking",
    responses(
        (status = 302, description = "Redirect to the Canva authorization page")
    )
)]
pub async fn start(State(state): State<AppState>, Query(params): Query<StartParams>) -> Response {
    let issued = nonce::issue(
        &state.config.cookie_secret,
        Utc::now().timestamp_millis(),
        state.config.nonce_ttl_ms,
    );

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("state", &params.state)
        .append_pair("nonce", &issued.nonce)
        .finish();
    let location = format!("{}?{query}", state.config.authorize_url);

    info!("starting account-linking handshake");
    redirect_to(location, issued.set_cookie)
}

/// Outcome query string appended to the configured redirect URL.
fn outcome_location(
    base: &str,
    state_param: &str,
    result: &Result<(String, String), AuthError>,
) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    match result {
        Ok((user, brand)) => {
            query
                .append_pair("success", "true")
                .append_pair("state", state_param)
                .append_pair("user", user)
                .append_pair("brand", brand);
        }
        Err(e) => {
            query
                .append_pair("success", "false")
                .append_pair("state", state_param)
                .append_pair("errors", e.error_code());
        }
    }
    format!("{base}?{}", query.finish())
}

/// Finish the linking flow: verify the signed redirect, the nonce
/// handshake, and the user token, then bounce back to Canva.
#[utoipa::path(
    get,
    path = "/configuration/redirect",
    tag = "Linking",
    responses(
        (status = 302, description = "Redirect back to Canva with the outcome"),
        (status = 401, description = "Signed redirect failed verification")
    )
)]
pub async fn redirect(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<RedirectParams>,
) -> Response {
    let now_millis = Utc::now().timestamp_millis();

    // Signature failure is a hard rejection: the request did not come from
    // Canva, so there is nowhere trustworthy to redirect to.
    if let Err(e) = orchestrator::verify_signed_redirect(
        &method,
        &params,
        &state.config.signing_secret,
        now_millis / 1000,
    ) {
        info!(code = e.error_code(), "rejected linking redirect");
        return e.into_response();
    }

    let outcome = check_handshake(&state, &headers, &params, now_millis).await;

    match &outcome {
        Ok(_) => info!("account-linking handshake completed"),
        Err(e) => info!(code = e.error_code(), "account-linking handshake failed"),
    }

    let location = outcome_location(
        &state.config.configured_redirect_url,
        &params.state,
        &outcome,
    );
    redirect_to(location, nonce::clear_cookie())
}

/// Nonce handshake then query-token verification. Any failure degrades to
/// the error-carrying redirect.
async fn check_handshake(
    state: &AppState,
    headers: &HeaderMap,
    params: &RedirectParams,
    now_millis: i64,
) -> Result<(String, String), AuthError> {
    let cookie_header = headers.get(COOKIE).and_then(|v| v.to_str().ok());
    let raw_cookie = nonce::find_cookie(cookie_header, NONCE_COOKIE);
    nonce::validate(
        raw_cookie,
        &params.nonce,
        &state.config.cookie_secret,
        now_millis,
    )?;

    let token = verifier::query_token(params.token.as_deref())?;
    let identity = verifier::verify_token(token, &state.jwks, &state.config.app_id).await?;

    Ok((identity.user_id, identity.brand_id))
}
