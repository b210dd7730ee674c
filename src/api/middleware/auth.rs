//! Session authentication middleware.
//!
//! Resolves the signed-in user through the context's `SessionAuthenticator`
//! and injects `AuthenticatedUser` into request extensions for downstream
//! handlers. Requests without a valid session are redirected to sign-in.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// Where unauthenticated browsers are sent.
pub const SIGN_IN_REDIRECT: &str = "/sign-in?returnBackUrl=/";

/// Require a signed-in user.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_session(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let Some(ctx) = req.extensions().get::<ApiContext>().cloned() else {
        return ApiError::Internal("missing API context".into()).into_response();
    };

    match ctx.authenticator.authenticate(req.headers()) {
        Some(user) => {
            tracing::debug!(user_id = %user.user_id, "Session authenticated");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            tracing::debug!(path = %req.uri().path(), "No session; redirecting to sign-in");
            Redirect::to(SIGN_IN_REDIRECT).into_response()
        }
    }
}
