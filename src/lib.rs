pub mod api; // HTTP surface: completion endpoint + analyzer
pub mod config;
pub mod pipeline;
pub mod progress; // Cosmetic progress indicator

use tracing_subscriber::EnvFilter;

use crate::config::{ConfigError, ServerConfig};
use crate::pipeline::processor::ProcessingError;

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline setup failed: {0}")]
    Pipeline(#[from] ProcessingError),

    #[error("{0}")]
    Server(String),
}

/// Start the server and run until Ctrl-C.
pub async fn run() -> Result<(), StartupError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServerConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let ctx = api::ApiContext::from_config(config)?;

    let mut server = api::start_server(ctx, bind_addr)
        .await
        .map_err(StartupError::Server)?;

    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }

    server.shutdown();
    server.stopped().await;
    Ok(())
}
