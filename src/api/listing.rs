// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Signed content-listing endpoint.
//!
//! Canva requests the resources this app can embed through an HMAC-signed
//! GET where the signed query parameters double as request parameters. The
//! resource list itself is a fixed catalog of Pulse report types.

use axum::{
    extract::{RawQuery, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::orchestrator;
use crate::state::AppState;

/// A single listable resource.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListingResource {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// Listing response in Canva's discriminator shape.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListingResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub resources: Vec<ListingResource>,
}

fn catalog() -> Vec<ListingResource> {
    vec![
        ListingResource {
            id: "engagement-summary",
            name: "Engagement summary",
            kind: "EMBED",
        },
        ListingResource {
            id: "follower-growth",
            name: "Follower growth",
            kind: "EMBED",
        },
        ListingResource {
            id: "top-posts",
            name: "Top posts",
            kind: "EMBED",
        },
    ]
}

/// Content listing handler.
#[utoipa::path(
    get,
    path = "/listing",
    tag = "Listing",
    responses(
        (status = 200, description = "Available resources", body = ListingResponse),
        (status = 401, description = "Request failed verification")
    )
)]
pub async fn listing(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let query: Vec<(String, String)> = raw_query
        .as_deref()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let verdict = orchestrator::verify_signed_get(
        &method,
        &headers,
        uri.path(),
        &query,
        &state.config.signing_secret,
        Utc::now().timestamp(),
    );

    match verdict {
        Ok(()) => (
            StatusCode::OK,
            Json(ListingResponse {
                kind: "SUCCESS",
                resources: catalog(),
            }),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
