//! HTTP surface.
//!
//! Two route groups share one `ApiContext`:
//! - `/api/*`: the completion endpoint and a health check, unauthenticated
//! - `/analyzer*`: the analyzer page and upload endpoints, behind session auth
//!
//! `app_router()` returns a `Router` that can be mounted on any axum server.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::app_router;
pub use server::{start_server, AppServer, ServerSession};
pub use types::{ApiContext, AuthenticatedUser, SessionAuthenticator, TokenAuthenticator};
