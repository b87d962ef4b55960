//! Application entry point for the `aqi-dashboard` service.
//!
//! This binary orchestrates the full startup sequence, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the upstream HTTP transport and the air-quality service
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `OPENAQ_API_URL`, `OPENAQ_API_KEY` (optional) – upstream API location and key
//! - `RETRY_*`, `HTTP_TIMEOUT_SECS` (optional) – upstream call behaviour
//! - `AQI_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AQI_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! See `config.rs` for the complete list and defaults.
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::Router;
use dotenvy::dotenv;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use aqi_dashboard::{config, routes, AirQualityService, HttpTransport};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let transport = HttpTransport::new(cfg.api_url.clone(), cfg.api_key.clone(), cfg.http_timeout)
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
    tracing::info!("Upstream API: {}", transport.base_url());
    let service = AirQualityService::new(transport).with_retry(cfg.retry);

    // Build app from routes gateway (EMBP)
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    let app: Router = routes::router(Arc::new(service), cfg);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Install the tracing subscriber before anything logs.
///
/// `RUST_LOG` wins when set; otherwise `AQI_LOG_LEVEL` picks the level for
/// this crate while hyper and reqwest stay at `info`. `AQI_SPAN_EVENTS`
/// (`full`, `enter_exit`) widens span output around `resolve`, whose
/// close event carries the `source` field. `FORCE_COLOR` overrides TTY
/// detection.
fn init_tracing() {
    // ---
    let span_events = match env::var("AQI_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AQI_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
