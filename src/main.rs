//! Civic Issue Analyzer — Binary Entrypoint
//! Boots the Axum HTTP server behind the Shuttle runtime, wiring the
//! analysis endpoint, the auth proxy, and the metrics exporter.
//!
//! See `README.md` for quickstart.

use civic_issue_analyzer::api::{self, AppState};
use civic_issue_analyzer::config::AppConfig;
use civic_issue_analyzer::metrics::Metrics;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - ANALYZE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("ANALYZE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("civic_issue_analyzer=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = AppConfig::from_env();

    // Install the Prometheus recorder before the first request can count.
    let metrics = Metrics::init(config.gemini.is_some() && !config.force_mock);

    let state = AppState::from_config(&config);
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
