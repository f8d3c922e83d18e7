//! Configuration
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults
//! 2. A TOML file: the explicit path (must exist) or `proutines.toml` in the
//!    working directory (optional)
//! 3. Environment variables, e.g. `PROUTINES__EXECUTOR__TICK_INTERVAL_MS=5`
//! 4. Overrides set on the [`ConfigBuilder`]
//!
//! [`Config::load`] also reads a `.env` file and honours `PROUTINES_CONFIG_PATH`.

use crate::error::RuntimeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_PREFIX: &str = "PROUTINES";
pub const CONFIG_PATH_ENV: &str = "PROUTINES_CONFIG_PATH";
const DEFAULT_FILE: &str = "proutines";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub executor: ExecutorConfig,
    pub offload: OffloadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Sleep between ticks of a dedicated-thread executor (0 = yield only)
    pub tick_interval_ms: u64,
    /// Convert panics escaping a coroutine step into faults
    pub catch_panics: bool,
    /// Log faults that reach the executor boundary
    pub log_faults: bool,
    /// Name of the dedicated executor thread
    pub thread_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1,
            catch_panics: true,
            log_faults: true,
            thread_name: "proutines-executor".to_string(),
        }
    }
}

impl ExecutorConfig {
    pub fn tick_interval(&self) -> Option<Duration> {
        (self.tick_interval_ms > 0).then(|| Duration::from_millis(self.tick_interval_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffloadConfig {
    pub max_blocking_threads: usize,
    pub thread_name: String,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            max_blocking_threads: 16,
            thread_name: "proutines-offload".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from `.env`, `PROUTINES_CONFIG_PATH`, the default file and the environment
    pub fn load() -> Result<Self, RuntimeError> {
        dotenvy::dotenv().ok();
        let path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        Config::builder().config_path(path).build()
    }

    /// Render the effective settings as TOML
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(config::ConfigError::Message(e.to_string())))
    }
}

/* ===================== Builder ===================== */

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    tick_interval_ms: Option<u64>,
    log_filter: Option<String>,
    skip_environment: bool,
}

impl ConfigBuilder {
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = Some(ms);
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Ignore `PROUTINES__*` variables (useful when the process environment is not trusted)
    pub fn skip_environment(mut self) -> Self {
        self.skip_environment = true;
        self
    }

    pub fn build(self) -> Result<Config, RuntimeError> {
        let mut sources = config::Config::builder();

        sources = match &self.config_path {
            Some(path) => sources.add_source(config::File::from(path.clone()).required(true)),
            None => sources.add_source(config::File::with_name(DEFAULT_FILE).required(false)),
        };

        if !self.skip_environment {
            sources = sources.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: Config = sources.build()?.try_deserialize()?;

        if let Some(ms) = self.tick_interval_ms {
            config.executor.tick_interval_ms = ms;
        }
        if let Some(filter) = self.log_filter {
            config.logging.filter = filter;
        }

        Ok(config)
    }
}
