//! Application router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Middleware stack (outermost → innermost):
//! 1. Audit logger (all routes) → 2. Session auth (`/analyzer*` only)

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::config::MAX_UPLOAD_BYTES;

/// Multipart bodies may exceed the file limit by this much before axum
/// refuses them, so slightly oversized files still get the validation dialog.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Build the application router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer
/// of the protected group). Endpoint handlers use `State<ApiContext>`.
pub fn app_router(ctx: ApiContext) -> Router {
    // Unprotected routes
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/AI_response", post(endpoints::ai_response::generate))
        .with_state(ctx.clone());

    // Protected routes: redirect to sign-in without a session.
    let analyzer = Router::new()
        .route("/", get(endpoints::analyzer::page))
        .route("/analyze", post(endpoints::analyzer::analyze))
        .route("/analyze/stream", post(endpoints::analyzer::analyze_stream))
        .with_state(ctx.clone())
        // Results are personal health data
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(DefaultBodyLimit::max(
            MAX_UPLOAD_BYTES as usize + MULTIPART_OVERHEAD_BYTES,
        ))
        .layer(axum::middleware::from_fn(middleware::auth::require_session))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", api)
        .nest("/analyzer", analyzer)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
}
