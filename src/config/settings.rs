use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub gas_estimator: GasEstimatorSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasEstimatorSettings {
    /// JSON-RPC endpoint used for `eth_estimateGas`.
    #[serde(default)]
    pub rpc_url: Option<String>,
    pub timeout_ms: u64,
    pub cache_ttl_seconds: u64,
    pub cache_capacity: u64,
    /// Headroom added on top of the node's estimate, in basis points.
    pub buffer_bps: u64,
    /// Estimates are rounded up to a multiple of this.
    pub rounding_granularity: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for GasEstimatorSettings {
    fn default() -> Self {
        GasEstimatorSettings {
            rpc_url: None,
            timeout_ms: 10_000,
            cache_ttl_seconds: 30,
            cache_capacity: 1_000,
            buffer_bps: 2_000,
            rounding_granularity: 1_000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl Settings {
    /// Loads settings from defaults, `config/engine.toml` and
    /// `COMET_ENGINE__*` environment variables, in increasing precedence.
    pub fn new() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let builder = Config::builder()
            .add_source(File::with_name("config/engine").required(false))
            .add_source(Environment::with_prefix("COMET_ENGINE").separator("__"));

        let settings = Self::from_builder(builder)?;
        info!(
            rpc_configured = settings.gas_estimator.rpc_url.is_some(),
            log_level = %settings.logging.level,
            "Configuration loaded successfully"
        );
        Ok(settings)
    }

    /// Applies defaults underneath the given sources, deserializes and validates.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let defaults = GasEstimatorSettings::default();
        let logging = LoggingSettings::default();

        let config = builder
            .set_default("gas_estimator.timeout_ms", defaults.timeout_ms as i64)?
            .set_default("gas_estimator.cache_ttl_seconds", defaults.cache_ttl_seconds as i64)?
            .set_default("gas_estimator.cache_capacity", defaults.cache_capacity as i64)?
            .set_default("gas_estimator.buffer_bps", defaults.buffer_bps as i64)?
            .set_default("gas_estimator.rounding_granularity", defaults.rounding_granularity as i64)?
            .set_default("logging.level", logging.level)?
            .set_default("logging.format", "compact")?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gas = &self.gas_estimator;
        if gas.timeout_ms == 0 {
            return Err(ConfigError::Message("gas_estimator.timeout_ms must be positive".to_string()));
        }
        if gas.rounding_granularity == 0 {
            return Err(ConfigError::Message(
                "gas_estimator.rounding_granularity must be positive".to_string(),
            ));
        }
        if gas.buffer_bps > 10_000 {
            return Err(ConfigError::Message(
                "gas_estimator.buffer_bps must not exceed 10000".to_string(),
            ));
        }
        if let Some(url) = &gas.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Message(format!("Invalid RPC URL: {}", url)));
            }
        }
        Ok(())
    }
}
