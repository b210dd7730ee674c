use std::collections::HashMap;
use std::net::SocketAddr;

/// Application-level constants
pub const APP_NAME: &str = "LabVision";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Largest accepted upload (10 MiB). A file of exactly this size is accepted.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Declared media types the analyzer accepts.
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg", "application/pdf"];

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 32_768;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Tracing filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "labvision=info,labvision_lib=info,tower_http=warn"
}

/// Runtime configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `None` means the interpreter is unavailable and `/api/AI_response` answers 500.
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// token → user id
    pub session_tokens: HashMap<String, String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 3000))),
            gemini_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            session_tokens: HashMap::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl ServerConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("LABVISION_BIND") {
            config.bind_addr = addr.parse().map_err(|_| ConfigError::InvalidValue {
                name: "LABVISION_BIND",
                value: addr.clone(),
            })?;
        }

        config.gemini_api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        if let Some(model) = lookup("LABVISION_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model.trim().to_string();
        }

        if let Some(raw) = lookup("LABVISION_MAX_OUTPUT_TOKENS") {
            config.max_output_tokens = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "LABVISION_MAX_OUTPUT_TOKENS",
                value: raw.clone(),
            })?;
        }

        if let Some(raw) = lookup("LABVISION_TEMPERATURE") {
            config.temperature = raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or(ConfigError::InvalidValue {
                    name: "LABVISION_TEMPERATURE",
                    value: raw.clone(),
                })?;
        }

        if let Some(raw) = lookup("LABVISION_SESSION_TOKENS") {
            config.session_tokens = parse_session_tokens(&raw)?;
        }

        Ok(config)
    }

    pub fn has_api_key(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

/// Parse `user_id:token` pairs separated by commas.
fn parse_session_tokens(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut tokens = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (user, token) = entry
            .split_once(':')
            .map(|(u, t)| (u.trim(), t.trim()))
            .filter(|(u, t)| !u.is_empty() && !t.is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                name: "LABVISION_SESSION_TOKENS",
                value: entry.to_string(),
            })?;
        tokens.insert(token.to_string(), user.to_string());
    }
    Ok(tokens)
}
