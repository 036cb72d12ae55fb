use axum::response::IntoResponse;

// axum handler for `/`
pub async fn root() -> impl IntoResponse {
    format!(
        "{} {} - OTP login and art generation API\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}
