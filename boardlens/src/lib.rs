//! # boardlens: Whiteboard Photo Processing
//!
//! `boardlens` turns photos of whiteboards into usable notes. A user uploads a
//! photo through the bundled single-page frontend, a vision model transcribes
//! everything written on the board, a second model pass condenses the
//! transcription into a summary, and both come back in one response.
//!
//! ## Overview
//!
//! Whiteboards are where decisions get made and where they get erased. The
//! usual rescue is a phone photo, which then rots in a camera roll as pixels
//! nobody can search or paste into a doc. `boardlens` closes that gap: it
//! accepts the photo, runs it through a two-stage model pipeline, and hands
//! back the board's content as structured text plus a concise summary of the
//! key points and action items.
//!
//! The service is deliberately stateless. Nothing is persisted, queued, or
//! retried; every upload is processed on the spot and the response is the only
//! artifact. That keeps deployment to a single binary with a YAML config file.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer. The frontend is embedded into the binary at compile time
//! and served with an SPA fallback.
//!
//! ### Request Flow
//!
//! A `POST /api/process-whiteboard` request carries the photo as the `image`
//! field of a multipart form. The handler pulls the image out of the form,
//! encodes it as a `data:` URI, and sends it with a fixed transcription
//! instruction to an OpenAI-compatible chat completions endpoint (the
//! extraction stage). The extracted text is then embedded into a summary
//! prompt and sent back to the same endpoint (the summarization stage). The
//! two stages are strictly sequential; a failure in either maps to a generic
//! 500 so that upstream details never leak to the browser.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the processing endpoint and serves the
//! embedded frontend. The **generation client** ([`generate`]) owns the wire
//! format of the two model calls behind a trait so tests can script stage
//! outputs. The **capture flow** ([`capture`]) defines the state machine the
//! frontend walks between selecting a photo and showing results.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use boardlens::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = boardlens::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize telemetry (structured logging and optional OpenTelemetry)
//!     boardlens::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     // Create and start the application
//!     let app = Application::new(config)?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod capture;
pub mod config;
pub mod errors;
pub mod generate;
mod openapi;
mod static_assets;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::generate::{Generate, GenerateReqwest};
use crate::openapi::ApiDoc;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{self, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `config`: Application configuration loaded from file/environment
/// - `generate`: Client for the generation endpoint, behind a trait so tests
///   can substitute scripted stage outputs
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    pub generate: Arc<dyn Generate>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let has_wildcard = config.cors.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard));

    let mut cors_layer = CorsLayer::new();

    // tower-http rejects a literal "*" inside an origin list, so the wildcard
    // switches matching mode entirely
    if has_wildcard {
        cors_layer = cors_layer.allow_origin(cors::Any);
    } else {
        let mut origins = Vec::new();
        for origin in &config.cors.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Serialize the origin without the trailing slash Url::as_str
                // would add, since browsers send Origin headers without one
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        cors_layer = cors_layer.allow_origin(origins).allow_credentials(config.cors.allow_credentials);
    }

    if let Some(max_age) = config.cors.max_age {
        cors_layer = cors_layer.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors_layer)
}

/// Build the application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - The whiteboard processing endpoint
/// - Static asset serving and SPA fallback
/// - OpenAPI docs at `/docs` (spec at `/api-docs/openapi.json`)
/// - Optional Prometheus metrics
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    // The browser sends the photo exactly as captured, so uploads are
    // unbounded unless a cap is configured
    let body_limit = match state.config.limits.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    // Serve embedded static assets, falling back to SPA for unmatched routes
    let fallback = get(api::handlers::static_assets::serve_embedded_asset).fallback(get(api::handlers::static_assets::spa_fallback));

    let router = Router::new()
        .route(
            "/api/process-whiteboard",
            post(api::handlers::whiteboard::process_whiteboard).layer(body_limit),
        )
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .fallback_service(fallback);

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;
    let mut router = router.layer(cors_layer);

    // Add Prometheus metrics if enabled
    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled application: router plus the configuration it was built from.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting boardlens with configuration: {:#?}", config);

        let generate = GenerateReqwest::new(&config.generation)?;

        let state = AppState::builder()
            .config(Arc::new(config.clone()))
            .generate(Arc::new(generate))
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "boardlens listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Shutdown telemetry
        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
