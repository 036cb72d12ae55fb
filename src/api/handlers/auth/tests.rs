//! Auth handler tests.

use super::otp::{send_otp, verify_otp};
use super::session::{logout, session};
use super::types::{SendOtpRequest, VerifyOtpRequest};
use super::{AuthConfig, AuthState, NoopRateLimiter, RateLimiter, WindowRateLimiter};
use crate::otp::{CodeDelivery, IssuedOtp, ManualClock, OtpConfig, OtpService};
use anyhow::{Context, Result, anyhow};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use chrono::{Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use secrecy::ExposeSecret;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Inbox {
    sent: Mutex<Vec<(String, String)>>,
}

impl Inbox {
    fn last_code(&self, email: &str) -> Result<String> {
        let sent = self.sent.lock().map_err(|_| anyhow!("inbox poisoned"))?;
        sent.iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
            .context("no code delivered")
    }
}

impl CodeDelivery for Inbox {
    fn deliver(&self, otp: &IssuedOtp) -> Result<()> {
        let mut sent = self.sent.lock().map_err(|_| anyhow!("inbox poisoned"))?;
        sent.push((otp.email.clone(), otp.code.expose_secret().to_string()));
        Ok(())
    }
}

struct ClosedOutbox;

impl CodeDelivery for ClosedOutbox {
    fn deliver(&self, _otp: &IssuedOtp) -> Result<()> {
        Err(anyhow!("email outbox is closed"))
    }
}

struct Harness {
    state: Arc<AuthState>,
    inbox: Arc<Inbox>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        Self::with_limiter(Arc::new(NoopRateLimiter))
    }

    fn with_limiter(limiter: Arc<dyn RateLimiter>) -> Self {
        let inbox = Arc::new(Inbox::default());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).single().unwrap_or_default(),
        ));
        let otp = OtpService::new(OtpConfig::new(), inbox.clone()).with_clock(clock.clone());
        let state = Arc::new(AuthState::new(
            AuthConfig::new("http://localhost:3000".to_string()),
            Arc::new(otp),
            limiter,
        ));
        Self {
            state,
            inbox,
            clock,
        }
    }

    async fn send(&self, email: &str) -> Response {
        send_otp(
            HeaderMap::new(),
            Extension(self.state.clone()),
            Some(Json(SendOtpRequest {
                email: email.to_string(),
            })),
        )
        .await
        .into_response()
    }

    async fn verify(&self, email: &str, code: &str) -> Response {
        verify_otp(
            HeaderMap::new(),
            Extension(self.state.clone()),
            Some(Json(VerifyOtpRequest {
                email: email.to_string(),
                code: code.to_string(),
            })),
        )
        .await
        .into_response()
    }

    async fn login(&self, email: &str) -> Result<String> {
        self.send(email).await;
        let code = self.inbox.last_code(email)?;
        let body = json_body(self.verify(email, &code).await).await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("missing token")
    }
}

fn bearer(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    Ok(headers)
}

async fn json_body(response: Response) -> Result<Value> {
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}

async fn expect_reason(response: Response, status: StatusCode, reason: &str) -> Result<()> {
    assert_eq!(response.status(), status);
    let body = json_body(response).await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], reason);
    Ok(())
}

#[tokio::test]
async fn send_otp_never_returns_the_code() -> Result<()> {
    let harness = Harness::new();
    let response = harness.send("a@b.com").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await?;
    let code = harness.inbox.last_code("a@b.com")?;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "OTP sent successfully");
    assert!(body.get("expires_at").is_some());
    assert!(!body.to_string().contains(&code));
    Ok(())
}

#[tokio::test]
async fn send_otp_rejects_missing_and_invalid_email() -> Result<()> {
    let harness = Harness::new();

    let response = send_otp(HeaderMap::new(), Extension(harness.state.clone()), None)
        .await
        .into_response();
    expect_reason(response, StatusCode::BAD_REQUEST, "validation").await?;

    let response = harness.send("   ").await;
    expect_reason(response, StatusCode::BAD_REQUEST, "validation").await?;

    let response = harness.send("not-an-email").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "Invalid email address");
    Ok(())
}

#[tokio::test]
async fn send_otp_canonicalizes_email() -> Result<()> {
    let harness = Harness::new();
    harness.send(" A@B.com ").await;
    let code = harness.inbox.last_code("a@b.com")?;

    let response = harness.verify("a@b.com", &code).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["email"], "a@b.com");
    Ok(())
}

#[tokio::test]
async fn send_otp_reports_delivery_failure() -> Result<()> {
    let otp = OtpService::new(OtpConfig::new(), Arc::new(ClosedOutbox));
    let state = Arc::new(AuthState::new(
        AuthConfig::new("http://localhost:3000".to_string()),
        Arc::new(otp),
        Arc::new(NoopRateLimiter),
    ));
    let response = send_otp(
        HeaderMap::new(),
        Extension(state),
        Some(Json(SendOtpRequest {
            email: "a@b.com".to_string(),
        })),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await?;
    assert_eq!(body["error"], "Failed to send OTP");
    Ok(())
}

#[tokio::test]
async fn verify_otp_maps_failures_to_reasons() -> Result<()> {
    let harness = Harness::new();

    let response = harness.verify("a@b.com", "123456").await;
    expect_reason(response, StatusCode::BAD_REQUEST, "not_found").await?;

    harness.send("a@b.com").await;
    let code = harness.inbox.last_code("a@b.com")?;
    let wrong = if code == "999999" { "100000" } else { "999999" };

    let response = harness.verify("a@b.com", wrong).await;
    expect_reason(response, StatusCode::BAD_REQUEST, "mismatch").await?;

    // A mismatch keeps the code, so the right one still works.
    let response = harness.verify("a@b.com", &code).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness.verify("a@b.com", &code).await;
    expect_reason(response, StatusCode::BAD_REQUEST, "not_found").await?;
    Ok(())
}

#[tokio::test]
async fn verify_otp_reports_expired_codes() -> Result<()> {
    let harness = Harness::new();
    harness.send("a@b.com").await;
    let code = harness.inbox.last_code("a@b.com")?;

    harness.clock.advance(Duration::seconds(121));
    let response = harness.verify("a@b.com", &code).await;
    expect_reason(response, StatusCode::BAD_REQUEST, "expired").await?;

    // Expired codes are purged.
    let response = harness.verify("a@b.com", &code).await;
    expect_reason(response, StatusCode::BAD_REQUEST, "not_found").await?;
    Ok(())
}

#[tokio::test]
async fn verify_otp_validates_input() -> Result<()> {
    let harness = Harness::new();

    let response = verify_otp(HeaderMap::new(), Extension(harness.state.clone()), None)
        .await
        .into_response();
    expect_reason(response, StatusCode::BAD_REQUEST, "validation").await?;

    let response = harness.verify("a@b.com", "").await;
    let body = json_body(response).await?;
    assert_eq!(body["error"], "Email and OTP are required");

    let response = harness.verify("a@b.com", "12ab56").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await?;
    assert_eq!(body["reason"], "validation");
    assert_eq!(
        body["error"],
        "Invalid OTP format. Please enter a 6-digit number."
    );
    Ok(())
}

#[tokio::test]
async fn rate_limited_requests_get_429() -> Result<()> {
    let harness = Harness::with_limiter(Arc::new(WindowRateLimiter::new(1)));

    let response = harness.send("a@b.com").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = harness.send("a@b.com").await;
    expect_reason(response, StatusCode::TOO_MANY_REQUESTS, "rate_limited").await?;
    Ok(())
}

#[tokio::test]
async fn session_and_logout_follow_token_lifecycle() -> Result<()> {
    let harness = Harness::new();
    let token = harness.login("a@b.com").await?;

    let response = session(bearer(&token)?, Extension(harness.state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["email"], "a@b.com");

    let response = logout(bearer(&token)?, Extension(harness.state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let response = session(bearer(&token)?, Extension(harness.state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Logging out twice is harmless.
    let response = logout(bearer(&token)?, Extension(harness.state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn logout_and_session_require_bearer() {
    let harness = Harness::new();

    let response = logout(HeaderMap::new(), Extension(harness.state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = session(HeaderMap::new(), Extension(harness.state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sessions_expire_after_ttl() -> Result<()> {
    let harness = Harness::new();
    let token = harness.login("a@b.com").await?;

    harness.clock.advance(Duration::days(7) + Duration::seconds(1));
    let response = session(bearer(&token)?, Extension(harness.state.clone()))
        .await
        .into_response();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
