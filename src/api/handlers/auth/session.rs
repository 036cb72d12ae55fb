//! Bearer session endpoints and the request gate used by protected routes.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::api::handlers::{ErrorResponse, error_response};
use crate::otp::Identity;

use super::state::AuthState;
use super::types::{LogoutResponse, SessionResponse};

#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 401, description = "Missing, unknown or expired token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    match authenticate_request(&headers, &auth_state).await {
        Ok(identity) => (
            StatusCode::OK,
            Json(SessionResponse {
                success: true,
                email: identity.email,
                created_at: identity.created_at,
                expires_at: identity.expires_at,
            }),
        )
            .into_response(),
        Err(response) => response,
    }
}

/// Revoke the presented token. Unknown tokens still succeed.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Session cleared", body = LogoutResponse),
        (status = 401, description = "No bearer token", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let Some(token) = extract_bearer_token(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "Authentication required", None);
    };

    auth_state.otp().revoke(&token).await;

    (
        StatusCode::OK,
        Json(LogoutResponse {
            success: true,
            message: "Logged out successfully".to_string(),
        }),
    )
        .into_response()
}

/// Resolve the bearer token into the identity that owns it.
///
/// Returns a ready 401 response when the header is missing or the token is
/// unknown, revoked or expired.
pub(crate) async fn authenticate_request(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<Identity, Response> {
    let Some(token) = extract_bearer_token(headers) else {
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Authentication required",
            None,
        ));
    };

    auth_state.otp().authenticate(&token).await.map_err(|err| {
        debug!("Rejected bearer token: {err}");
        error_response(StatusCode::UNAUTHORIZED, err.to_string(), None)
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
