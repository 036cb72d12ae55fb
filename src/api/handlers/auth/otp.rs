//! One-time passcode endpoints.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::handlers::{ErrorResponse, error_response};
use crate::otp::{AuthError, ValidationError};

use super::rate_limit::{RateLimitAction, RateLimitDecision};
use super::state::AuthState;
use super::types::{SendOtpRequest, SendOtpResponse, VerifyOtpRequest, VerifyOtpResponse};
use super::utils::{extract_client_ip, normalize_email, valid_code, valid_email};

/// Issue a code for the email and hand it to the outbox.
#[utoipa::path(
    post,
    path = "/auth/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code sent", body = SendOtpResponse),
        (status = 400, description = "Missing or invalid email", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Code could not be queued", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn send_otp(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SendOtpRequest>>,
) -> impl IntoResponse {
    let email = payload
        .map(|Json(request)| normalize_email(&request.email))
        .unwrap_or_default();
    if email.is_empty() {
        return validation_response(&ValidationError::MissingEmail);
    }
    if !valid_email(&email) {
        return validation_response(&ValidationError::InvalidEmail);
    }

    if let Some(response) =
        check_rate_limits(&headers, &auth_state, &email, RateLimitAction::SendOtp)
    {
        return response;
    }

    match auth_state.otp().send_code(&email).await {
        Ok(expires_at) => (
            StatusCode::OK,
            Json(SendOtpResponse {
                success: true,
                message: "OTP sent successfully".to_string(),
                expires_at,
            }),
        )
            .into_response(),
        Err(AuthError::Validation(err)) => validation_response(&err),
        Err(err) => {
            error!("Failed to send OTP: {err:#}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send OTP", None)
        }
    }
}

/// Exchange a code for a bearer session token.
#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted, session created", body = VerifyOtpResponse),
        (status = 400, description = "Invalid input, or no such, expired or wrong code", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return validation_response(&ValidationError::MissingCode);
    };

    let email = normalize_email(&request.email);
    let code = request.code.trim();
    if email.is_empty() || code.is_empty() {
        return validation_response(&ValidationError::MissingCode);
    }
    if !valid_code(code) {
        return validation_response(&ValidationError::MalformedCode);
    }

    if let Some(response) =
        check_rate_limits(&headers, &auth_state, &email, RateLimitAction::VerifyOtp)
    {
        return response;
    }

    match auth_state.otp().verify(&email, code).await {
        Ok(session) => {
            info!("OTP login succeeded");
            (
                StatusCode::OK,
                Json(VerifyOtpResponse {
                    success: true,
                    message: "Login successful".to_string(),
                    token: session.token,
                    email: session.email,
                }),
            )
                .into_response()
        }
        Err(err) => auth_error_response(&err),
    }
}

/// Map a core failure onto the HTTP contract.
fn auth_error_response(err: &AuthError) -> Response {
    match err {
        AuthError::Internal(source) => {
            error!("Auth operation failed: {source:#}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                None,
            )
        }
        AuthError::Unauthenticated => error_response(StatusCode::UNAUTHORIZED, err.to_string(), None),
        AuthError::Validation(_)
        | AuthError::NotFound
        | AuthError::Expired
        | AuthError::Mismatch => {
            warn!(reason = err.reason(), "OTP verification rejected");
            error_response(StatusCode::BAD_REQUEST, err.to_string(), Some(err.reason()))
        }
    }
}

fn validation_response(err: &ValidationError) -> Response {
    error_response(StatusCode::BAD_REQUEST, err.to_string(), Some("validation"))
}

fn check_rate_limits(
    headers: &HeaderMap,
    auth_state: &AuthState,
    email: &str,
    action: RateLimitAction,
) -> Option<Response> {
    let client_ip = extract_client_ip(headers);
    let limiter = auth_state.rate_limiter();
    // Rate limits are enforced before any code work.
    if limiter.check_ip(client_ip.as_deref(), action) == RateLimitDecision::Limited
        || limiter.check_email(email, action) == RateLimitDecision::Limited
    {
        warn!(?action, "rate limited");
        return Some(error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests, please try again later",
            Some("rate_limited"),
        ));
    }
    None
}
