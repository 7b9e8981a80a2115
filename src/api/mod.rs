// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{auth::AuthenticatedIdentity, state::AppState};

pub mod health;
pub mod linking;
pub mod listing;
pub mod me;
pub mod webhook;

pub fn router(state: AppState) -> Router {
    // Signed routes are registered for every verb so the verification
    // pipeline owns the wrong-method rejection.
    let routes = Router::new()
        .route("/hook", any(webhook::hook))
        .route("/listing", any(listing::listing))
        .route("/configuration/start", get(linking::start))
        .route("/configuration/redirect", any(linking::redirect))
        .route("/v1/me", get(me::me))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .with_state(state);

    routes
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        webhook::hook,
        listing::listing,
        linking::start,
        linking::redirect,
        me::me,
        health::health,
        health::ready
    ),
    components(
        schemas(
            AuthenticatedIdentity,
            webhook::WebhookResponse,
            listing::ListingResponse,
            listing::ListingResource,
            health::HealthResponse,
            health::ReadyResponse,
            health::ReadyChecks
        )
    ),
    tags(
        (name = "Webhook", description = "Signed webhook delivery"),
        (name = "Listing", description = "Signed content listing"),
        (name = "Linking", description = "Account-linking handshake"),
        (name = "Identity", description = "Bearer-token identity"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
