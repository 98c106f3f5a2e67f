use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::MatchPolicy;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/87.0.4280.88 Safari/537.36";

const DEFAULT_CONFIG_FILE: &str = "stockscan.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub scanner: ScraperConfig,
    pub scheduler: SchedulerConfig,
    pub search: SearchConfig,
    pub persistence: PersistenceConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScraperConfig {
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub max_concurrent_scans: usize,
    pub include_dummy: bool,
    pub dummy_delay_ms: u64,
    pub alternate_locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub scan_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    pub match_policy: MatchPolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersistenceConfig {
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry_attempts: 0,
            retry_delay_ms: 500,
            max_concurrent_scans: 8,
            include_dummy: false,
            dummy_delay_ms: 0,
            alternate_locale: "fr".to_string(),
        }
    }
}

impl ScraperConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn dummy_delay(&self) -> Duration {
        Duration::from_millis(self.dummy_delay_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            scan_timeout_secs: 30,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::Keywords,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9001,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scanner: ScraperConfig::default(),
            scheduler: SchedulerConfig::default(),
            search: SearchConfig::default(),
            persistence: PersistenceConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layer built-in defaults, an optional TOML file and `STOCKSCAN__*`
    /// environment variables, then validate.
    ///
    /// An explicitly given file must exist; the default `stockscan.toml` is
    /// only read when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = Config::try_from(&AppConfig::default())?;

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let s = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix("STOCKSCAN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate scanner configuration
        if self.scanner.request_timeout_secs == 0 {
            return Err(ConfigError::Message("Scanner request_timeout_secs must be greater than 0".into()));
        }

        if self.scanner.user_agent.trim().is_empty() {
            return Err(ConfigError::Message("Scanner user_agent must not be empty".into()));
        }

        if self.scanner.max_concurrent_scans == 0 {
            return Err(ConfigError::Message("Scanner max_concurrent_scans must be greater than 0".into()));
        }

        if self.scanner.alternate_locale.trim().is_empty() {
            return Err(ConfigError::Message("Scanner alternate_locale must not be empty".into()));
        }

        // Validate scheduler configuration
        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::Message("Scheduler interval_secs must be greater than 0".into()));
        }

        if self.scheduler.scan_timeout_secs == 0 {
            return Err(ConfigError::Message("Scheduler scan_timeout_secs must be greater than 0".into()));
        }

        // Validate metrics configuration
        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::Message("Metrics port must be greater than 0".into()));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
