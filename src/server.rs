//! HTTP server that serves pages carrying the tracking pixel.
//!
//! Useful for exercising the subsystem end-to-end with a browser or `curl`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/pixel` | HTML page with the pixel; `sku`/`value` query pairs become conversions |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/pixel?sku=ABC-1&value=19.99&sku=XYZ-2&value=4.50` records two
//! conversions in that order. Each `sku` is paired with the `value` at the
//! same position; unpaired entries are dropped.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "internal", "message": "..." } }
//! ```

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::beacon::escape_html;
use crate::config::{Config, SharedSettings};
use crate::context::{RequestContext, Tracker};
use crate::error::CookieError;
use crate::reporter::{ErrorReporterHandle, TracingReporter};

/// Shared application state passed to all route handlers.
///
/// Both fields are read-only after startup; per-request state lives in a
/// [`Tracker`] built inside the handler.
#[derive(Clone)]
struct AppState {
    settings: SharedSettings,
    reporter: ErrorReporterHandle,
}

/// Starts the server on `[server].bind`, reporting integrity failures
/// through `tracing`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    run_server_with_reporter(config, Arc::new(TracingReporter)).await
}

/// Like [`run_server`], with a caller-supplied error reporter.
pub async fn run_server_with_reporter(
    config: &Config,
    reporter: ErrorReporterHandle,
) -> anyhow::Result<()> {
    let settings = config.settings()?;
    let bind_addr = config.server.bind.clone();

    let app = router(settings.clone(), reporter);

    tracing::info!(
        bind = %bind_addr,
        site = %settings.site_shortname,
        enabled = settings.enabled,
        "beacon server listening"
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the application router.
pub fn router(settings: SharedSettings, reporter: ErrorReporterHandle) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/pixel", get(handle_pixel))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { settings, reporter })
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<CookieError> for AppError {
    fn from(err: CookieError) -> Self {
        tracing::error!(error = %err, "failed to issue visitor cookie");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /pixel ============

/// Handler for `GET /pixel`.
///
/// Builds a [`Tracker`] from the request headers, records the query's
/// conversions, and returns an HTML page with the pixel plus any
/// `Set-Cookie` headers the request produced.
async fn handle_pixel(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Response, AppError> {
    let mut tracker = Tracker::new(
        state.settings.clone(),
        state.reporter.clone(),
        RequestContext::from_headers(&headers),
    );

    for (sku, value) in conversion_pairs(&params) {
        tracker.add_conversion(sku, value);
    }

    let pixel = tracker.display_pixel()?.unwrap_or_default();
    let body = render_page(&state.settings.site_shortname, &pixel);

    let cookies = tracker
        .set_cookie_headers()
        .into_iter()
        .map(|c| (header::SET_COOKIE, c));

    Ok((AppendHeaders(cookies), Html(body)).into_response())
}

/// Wraps already-rendered pixel markup in a minimal page titled `title`.
fn render_page(title: &str, pixel: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><title>{}</title></head><body>\n{}\n</body></html>\n",
        escape_html(title),
        pixel
    )
}

/// Pairs the i-th `sku` with the i-th `value`.
fn conversion_pairs(params: &[(String, String)]) -> Vec<(String, String)> {
    let skus = params.iter().filter(|(k, _)| k == "sku").map(|(_, v)| v);
    let values = params.iter().filter(|(k, _)| k == "value").map(|(_, v)| v);
    skus.zip(values)
        .map(|(s, v)| (s.clone(), v.clone()))
        .collect()
}
