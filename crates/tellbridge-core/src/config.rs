/*!
 * Configuration management for tellbridge.
 *
 * This module loads the bridge configuration (vendor credentials, manual
 * device overrides and a few tuning knobs) from a file and the environment,
 * and validates that the credentials needed for the selected API mode are
 * present.
 */
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::{Config as ConfigLib, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::Id;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Telldus Live consumer public key
    #[serde(default)]
    pub public_key: Option<String>,

    /// Telldus Live consumer private key
    #[serde(default)]
    pub private_key: Option<String>,

    /// Telldus Live OAuth token
    #[serde(default)]
    pub token: Option<String>,

    /// Telldus Live OAuth token secret
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Local TellStick API settings; when present the bridge runs in local mode
    #[serde(default)]
    pub local: Option<LocalConfig>,

    /// Manual corrections for devices the vendor API describes badly
    #[serde(default)]
    pub unknown_accessories: Vec<DeviceOverride>,

    /// Bridge behaviour tuning
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local TellStick API settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Host name or IP address of the TellStick
    #[serde(default)]
    pub ip_address: Option<String>,

    /// Bearer token issued by the TellStick
    #[serde(default)]
    pub access_token: Option<String>,
}

/// A manual override for one vendor device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceOverride {
    /// Vendor device id (cloud mode)
    #[serde(default)]
    pub id: Option<Id>,

    /// Local device id (local mode)
    #[serde(default)]
    pub local_id: Option<Id>,

    /// Vendor listing type the local id refers to (`device`, `sensor`, ...)
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    /// Replacement model
    #[serde(default)]
    pub model: Option<String>,

    /// Replacement manufacturer
    #[serde(default)]
    pub manufacturer: Option<String>,

    /// Replacement display name
    #[serde(default)]
    pub name: Option<String>,

    /// Hide the device entirely
    #[serde(default)]
    pub disabled: bool,
}

/// Bridge behaviour tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Delay after a dim command before the set completes, in milliseconds
    #[serde(default = "default_dim_delay_ms")]
    pub dim_delay_ms: u64,

    /// Timeout for a single vendor HTTP request, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to include the log target in each line
    #[serde(default = "default_log_target")]
    pub with_target: bool,
}

/// Vendor API credentials, validated for one API mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Local TellStick REST API
    Local {
        /// Host name or IP address
        host: String,
        /// Bearer token
        access_token: String,
    },
    /// Telldus Live cloud API
    Live {
        /// Consumer public key
        public_key: String,
        /// Consumer private key
        private_key: String,
        /// OAuth token
        token: String,
        /// OAuth token secret
        token_secret: String,
    },
}

impl Credentials {
    /// Whether these credentials select the local API
    pub fn is_local(&self) -> bool {
        matches!(self, Credentials::Local { .. })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            public_key: None,
            private_key: None,
            token: None,
            token_secret: None,
            local: None,
            unknown_accessories: Vec::new(),
            bridge: BridgeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            dim_delay_ms: default_dim_delay_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: default_log_target(),
        }
    }
}

fn default_dim_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_target() -> bool {
    true
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::config(format!("{} is required", field))),
    }
}

impl Config {
    /// Whether the local API mode is selected
    pub fn is_local(&self) -> bool {
        self.local.is_some()
    }

    /// Validate and return the credentials for the selected API mode
    ///
    /// Local mode needs `local.ip_address` and `local.access_token`; cloud
    /// mode needs all four Live credentials.
    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(local) = &self.local {
            return Ok(Credentials::Local {
                host: required(&local.ip_address, "local.ip_address")?,
                access_token: required(&local.access_token, "local.access_token")?,
            });
        }

        Ok(Credentials::Live {
            public_key: required(&self.public_key, "public_key")?,
            private_key: required(&self.private_key, "private_key")?,
            token: required(&self.token, "token")?,
            token_secret: required(&self.token_secret, "token_secret")?,
        })
    }

    /// Check that the credentials for the selected API mode are present
    pub fn validate(&self) -> Result<()> {
        self.credentials().map(|_| ())
    }

    /// Delay applied after dim commands
    pub fn dim_delay(&self) -> Duration {
        Duration::from_millis(self.bridge.dim_delay_ms)
    }

    /// Timeout for one vendor HTTP request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge.request_timeout_ms)
    }
}

/// A builder for creating a configuration
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_file: Option<String>,
    environment_prefix: Option<String>,
    override_with: Option<Config>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the config file path
    pub fn with_config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Set the environment variable prefix for configuration
    pub fn with_environment_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.environment_prefix = Some(prefix.as_ref().to_string());
        self
    }

    /// Override with an existing config
    pub fn override_with(mut self, config: Config) -> Self {
        self.override_with = Some(config);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        let mut config_builder = ConfigLib::builder();

        let default_config = Config::default();
        config_builder = config_builder.add_source(
            ConfigLib::try_from(&default_config)
                .map_err(|e| Error::config(format!("Failed to create default config: {}", e)))?,
        );

        if let Some(config_file) = self.config_file {
            let path = Path::new(&config_file);
            if !path.exists() {
                return Err(Error::config(format!(
                    "Configuration file {} does not exist",
                    config_file
                )));
            }
            debug!("Loading configuration from {}", config_file);
            config_builder = config_builder.add_source(File::with_name(&config_file));
        }

        if let Some(prefix) = self.environment_prefix {
            debug!("Loading configuration from environment variables with prefix {}", prefix);
            config_builder = config_builder.add_source(
                Environment::with_prefix(&prefix)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config_lib = config_builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build configuration: {}", e)))?;

        let mut config: Config = config_lib
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize configuration: {}", e)))?;

        if let Some(override_config) = self.override_with {
            config = override_config;
        }

        info!(
            "Configuration loaded ({} mode, {} device overrides)",
            if config.is_local() { "local" } else { "cloud" },
            config.unknown_accessories.len()
        );
        Ok(config)
    }
}

/// A thread-safe reference to a configuration
#[derive(Debug, Clone)]
pub struct SharedConfig(Arc<Config>);

impl SharedConfig {
    /// Create a new SharedConfig
    pub fn new(config: Config) -> Self {
        Self(Arc::new(config))
    }

    /// Get a reference to the config
    pub fn get(&self) -> &Config {
        &self.0
    }
}

impl From<Config> for SharedConfig {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}

impl AsRef<Config> for SharedConfig {
    fn as_ref(&self) -> &Config {
        self.get()
    }
}
