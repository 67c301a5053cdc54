//! Talk server binary.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `skillshare-config.yaml`
//! 2. Initialize structured logging (tracing), then report the config source
//! 3. Create the in-memory talk state
//! 4. Serve until `Ctrl-C`

use std::sync::Arc;

use skillshare_server::config::{
    ConfigError, ConfigSource, LogFormat, LoggingConfig, SkillShareConfig,
};
use skillshare_server::server::{self, ServerError};
use skillshare_server::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Top-level error for the talk server binary.
#[derive(Debug, thiserror::Error)]
enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: ServerError,
    },
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Logging comes after config so the configured level applies.
    let (
        SkillShareConfig {
            server: server_config,
            poll,
            logging,
        },
        source,
    ) = SkillShareConfig::load()?;
    init_tracing(&logging);

    match source {
        ConfigSource::File(path) => info!(path = %path.display(), "Config file loaded"),
        ConfigSource::Defaults(path) => {
            info!(path = %path.display(), "Config file not found, using defaults");
        }
    }

    info!(
        host = server_config.host,
        port = server_config.port,
        max_wait_secs = poll.max_wait_secs,
        "Configuration loaded"
    );

    let state = Arc::new(AppState::with_config(poll, server_config.static_root.clone()));

    server::start_server(&server_config, state, server::ctrl_c()).await?;

    info!("skillshare shutdown complete");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the config level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match logging.format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}
