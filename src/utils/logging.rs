use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingSettings};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Calling this twice
/// returns an error instead of panicking.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = settings.level.parse::<Level>().unwrap_or(Level::INFO);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("comet_action_engine={}", level).into());

    match settings.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .pretty()
            .try_init()?,
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .compact()
            .try_init()?,
    }

    info!(level = %settings.level, format = ?settings.format, "Logging initialized");
    Ok(())
}
