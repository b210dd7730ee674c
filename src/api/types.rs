//! Shared types for the HTTP layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap};

use crate::config::ServerConfig;
use crate::pipeline::interpretation::types::LlmClient;
use crate::pipeline::processor::{
    build_analyzer, build_gemini_client, LabReportAnalyzer, ProcessingError,
};
use crate::progress::PROGRESS_TICK;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "__session";

// ═══════════════════════════════════════════════════════════
// API context: shared state for all routes
// ═══════════════════════════════════════════════════════════

/// Shared context for all routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<ServerConfig>,
    /// `None` when no model API key is configured.
    pub llm: Option<Arc<dyn LlmClient>>,
    pub analyzer: Arc<LabReportAnalyzer>,
    pub authenticator: Arc<dyn SessionAuthenticator>,
    /// Tick of the cosmetic progress animation on the streaming endpoint.
    pub progress_interval: Duration,
}

impl ApiContext {
    pub fn new(
        config: ServerConfig,
        llm: Option<Arc<dyn LlmClient>>,
        analyzer: LabReportAnalyzer,
        authenticator: Arc<dyn SessionAuthenticator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            llm,
            analyzer: Arc::new(analyzer),
            authenticator,
            progress_interval: PROGRESS_TICK,
        }
    }

    /// Wire up production implementations from configuration.
    pub fn from_config(config: ServerConfig) -> Result<Self, ProcessingError> {
        let gemini = build_gemini_client(&config)?;
        let analyzer = build_analyzer(gemini.clone());
        let llm = gemini.map(|client| client as Arc<dyn LlmClient>);
        let authenticator = Arc::new(TokenAuthenticator::new(config.session_tokens.clone()));

        if config.session_tokens.is_empty() {
            tracing::warn!("No session tokens configured; /analyzer will always redirect to sign-in");
        }

        Ok(Self::new(config, llm, analyzer, authenticator))
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}

// ═══════════════════════════════════════════════════════════
// Session authentication
// ═══════════════════════════════════════════════════════════

/// Signed-in user, injected into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Resolves the signed-in user from request headers (allows mocking).
pub trait SessionAuthenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Option<AuthenticatedUser>;
}

/// Accepts a bearer token or `__session` cookie from a fixed token set.
pub struct TokenAuthenticator {
    /// token → user id
    tokens: HashMap<String, String>,
}

impl TokenAuthenticator {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }
}

impl SessionAuthenticator for TokenAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Option<AuthenticatedUser> {
        let token = bearer_token(headers).or_else(|| session_cookie(headers))?;
        self.tokens.get(token).map(|user_id| AuthenticatedUser {
            user_id: user_id.clone(),
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn authenticator() -> TokenAuthenticator {
        let mut tokens = HashMap::new();
        tokens.insert("tok-a".to_string(), "alice".to_string());
        TokenAuthenticator::new(tokens)
    }

    #[test]
    fn accepts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-a"));
        assert_eq!(
            authenticator().authenticate(&headers),
            Some(AuthenticatedUser {
                user_id: "alice".into()
            })
        );
    }

    #[test]
    fn accepts_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; __session=tok-a; lang=en"),
        );
        assert_eq!(
            authenticator().authenticate(&headers).map(|u| u.user_id),
            Some("alice".to_string())
        );
    }

    #[test]
    fn rejects_unknown_or_missing_token() {
        let mut headers = HeaderMap::new();
        assert!(authenticator().authenticate(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert!(authenticator().authenticate(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic tok-a"));
        assert!(authenticator().authenticate(&headers).is_none());
    }

    #[test]
    fn context_from_config_without_key_has_no_llm() {
        let ctx = ApiContext::from_config(ServerConfig::default()).unwrap();
        assert!(ctx.llm.is_none());
        assert_eq!(ctx.progress_interval, PROGRESS_TICK);
    }
}
