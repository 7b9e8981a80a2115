// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Pulse Analytics

//! Pulse Canva Backend - Request Authentication Gateway
//!
//! This crate fronts the Pulse analytics backend for its Canva app. Every
//! inbound request is authenticated before any business handler runs:
//! HMAC-signed webhook and listing requests, the signed account-linking
//! redirect with its nonce handshake, and Canva-issued bearer JWTs verified
//! against a cached JWKS.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Signature, timestamp, JWT, and nonce verification
//! - `config` - Environment-derived runtime configuration
//! - `state` - Shared router state

pub mod api;
pub mod auth;
pub mod config;
pub mod state;
