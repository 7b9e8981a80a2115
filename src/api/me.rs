// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

use axum::Json;

use crate::auth::{Auth, AuthenticatedIdentity};

/// Return the authenticated caller's identity.
///
/// Exercises the full bearer pipeline; the frontend uses it to resolve the
/// acting user and brand after loading inside Canva.
#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Identity",
    responses(
        (status = 200, description = "Verified caller identity", body = AuthenticatedIdentity),
        (status = 401, description = "Token failed verification")
    )
)]
pub async fn me(Auth(identity): Auth) -> Json<AuthenticatedIdentity> {
    Json(identity)
}
