//! API handlers and shared response helpers.
//!
//! Failures are reported as `{success: false, error, reason?}` so the
//! frontend can branch on `reason` without parsing messages.

pub mod art;
pub mod auth;
pub mod health;
pub mod root;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub(crate) fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    reason: Option<&str>,
) -> Response {
    let body = ErrorResponse {
        success: false,
        error: error.into(),
        reason: reason.map(str::to_string),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn error_response_omits_missing_reason() -> Result<()> {
        let response = error_response(StatusCode::UNAUTHORIZED, "Authentication required", None);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = response.into_body().collect().await?.to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Authentication required");
        assert!(value.get("reason").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn error_response_carries_reason() -> Result<()> {
        let response = error_response(StatusCode::BAD_REQUEST, "OTP has expired", Some("expired"));
        let bytes = response.into_body().collect().await?.to_bytes();
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(value["reason"], "expired");
        Ok(())
    }
}
