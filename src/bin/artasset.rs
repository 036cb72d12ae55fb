use anyhow::Result;
use artasset::cli::{self, telemetry};

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine; real env vars still apply.
    dotenvy::dotenv().ok();

    let action = cli::start()?;

    let result = action.execute().await;

    telemetry::shutdown_tracer();

    result
}
