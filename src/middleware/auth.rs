//! API key and webhook signature verification for the calculation endpoint.
//!
//! Both checks are thin adapters with fixed contracts: 401 on missing or
//! invalid credentials, 500 when a check is enabled but its secret is not
//! configured. All comparisons are constant-time.

use axum::{
    Json,
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hmac::{Hmac, Mac};
use http::StatusCode;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{AppState, models::ApiError};

/// Header carrying the HMAC-SHA256 signature of the request body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Webhook-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Verify the bearer API key when `auth.require_api_key` is enabled.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let auth = &state.config.auth;
    if !auth.require_api_key {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("API key required");
    };

    let Some(expected) = auth.api_key.as_deref() else {
        tracing::error!("API key authentication enabled but no key configured");
        return internal_error("API key not configured");
    };

    if !bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
        tracing::warn!("invalid API key attempt");
        return unauthorized("Invalid API key");
    }

    next.run(request).await
}

/// Verify the HMAC-SHA256 signature of the raw request body when
/// `auth.webhook_signature` is enabled.
///
/// The body is buffered for verification and re-attached to the request
/// before it continues down the stack.
pub async fn webhook_signature_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let config = &state.config.auth.webhook_signature;
    if !config.enabled {
        return next.run(request).await;
    }

    let signature = request
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let Some(signature) = signature else {
        tracing::warn!("missing webhook signature header");
        return unauthorized("Webhook signature required");
    };

    let Some(secret) = config.secret.clone() else {
        tracing::error!("webhook signature verification enabled but no secret configured");
        return internal_error("Webhook secret not configured");
    };

    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.config.server.body_limit_bytes).await {
        Ok(bytes) => bytes,
        Err(error) => {
            tracing::warn!(%error, "failed to buffer request body for signature check");
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new("Unreadable request body")),
            )
                .into_response();
        }
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(&bytes);
    let expected = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

    if !bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
        tracing::warn!("invalid webhook signature");
        return unauthorized("Invalid webhook signature");
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::new(message))).into_response()
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(message)),
    )
        .into_response()
}
