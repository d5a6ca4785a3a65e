//! Configuration management for strata.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - CLI argument overrides
//! - Validation and defaults

use crate::core::{Result, StrataError};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration for strata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// In-memory aggregation configuration
    pub inmem: InmemConfig,
    /// Metric service facade configuration
    pub service: MetricServiceConfig,
    /// HTTP display endpoint configuration
    pub http: HttpConfig,
    /// Dump configuration
    pub dump: DumpConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// In-memory sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InmemConfig {
    /// Width of one aggregation bucket
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Total history kept, `retain / interval` buckets
    #[serde(with = "humantime_serde")]
    pub retain: Duration,
}

/// Metric service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricServiceConfig {
    /// Host name prefix; resolved from the OS when unset and enabled
    pub host_name: Option<String>,
    /// Service name prefix
    pub service_name: String,
    /// Unit that timer samples are expressed in
    #[serde(with = "humantime_serde")]
    pub timer_granularity: Duration,
    /// How often runtime metrics are collected
    #[serde(with = "humantime_serde")]
    pub profile_interval: Duration,
    /// Prefix keys with the host name
    pub enable_host_name: bool,
    /// Prefix keys with the service name
    pub enable_service_name: bool,
    /// Suffix keys with the metric type
    pub enable_type_suffix: bool,
    /// Periodically emit runtime metrics
    pub enable_runtime_metrics: bool,
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Serve the display endpoint
    pub enabled: bool,
    /// Bind address
    pub bind_address: IpAddr,
    /// Listen port
    pub port: u16,
    /// Enable permissive CORS headers
    pub enable_cors: bool,
}

/// Dump configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// File the current interval is periodically written to
    pub file: Option<PathBuf>,
    /// How often the file is rewritten
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Dump completed intervals to stderr on SIGUSR1
    pub signal: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for InmemConfig {
    fn default() -> Self {
        InmemConfig {
            interval: Duration::from_secs(10),
            retain: Duration::from_secs(60),
        }
    }
}

impl Default for MetricServiceConfig {
    fn default() -> Self {
        MetricServiceConfig {
            host_name: None,
            service_name: "strata".to_string(),
            timer_granularity: Duration::from_millis(1),
            profile_interval: Duration::from_secs(3),
            enable_host_name: false,
            enable_service_name: true,
            enable_type_suffix: false,
            enable_runtime_metrics: true,
        }
    }
}

impl MetricServiceConfig {
    /// Defaults with the given service name
    pub fn with_service_name(name: impl Into<String>) -> Self {
        MetricServiceConfig {
            service_name: name.into(),
            ..Self::default()
        }
    }

    /// A config that adds no prefixes or suffixes and collects nothing
    pub fn plain() -> Self {
        MetricServiceConfig {
            host_name: None,
            service_name: String::new(),
            timer_granularity: Duration::from_millis(1),
            profile_interval: Duration::from_secs(3),
            enable_host_name: false,
            enable_service_name: false,
            enable_type_suffix: false,
            enable_runtime_metrics: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            enabled: true,
            bind_address: "127.0.0.1".parse().expect("Valid default IP address"),
            port: 9102,
            enable_cors: false,
        }
    }
}

impl Default for DumpConfig {
    fn default() -> Self {
        DumpConfig {
            file: None,
            interval: Duration::from_secs(10),
            signal: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Result<Self> {
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.inmem.interval.is_zero() {
            return Err(StrataError::config("inmem.interval must be greater than 0"));
        }

        if self.inmem.retain < self.inmem.interval {
            return Err(StrataError::config(format!(
                "inmem.retain ({:?}) must be at least one interval ({:?})",
                self.inmem.retain, self.inmem.interval
            )));
        }

        if self.service.timer_granularity.is_zero() {
            return Err(StrataError::config("service.timer_granularity must be greater than 0"));
        }

        if self.service.enable_runtime_metrics && self.service.profile_interval.is_zero() {
            return Err(StrataError::config(
                "service.profile_interval must be greater than 0 when runtime metrics are enabled",
            ));
        }

        if self.dump.file.is_some() && self.dump.interval.is_zero() {
            return Err(StrataError::config("dump.interval must be greater than 0"));
        }

        if self.http.enabled && self.http.port == 0 {
            return Err(StrataError::config("http.port must be set when http is enabled"));
        }

        Ok(())
    }

    /// Number of buckets the in-memory sink keeps
    pub fn max_intervals(&self) -> usize {
        let interval = self.inmem.interval.as_nanos();
        if interval == 0 {
            return 0;
        }
        usize::try_from(self.inmem.retain.as_nanos() / interval).unwrap_or(usize::MAX)
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| StrataError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Set the aggregation interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.inmem.interval = interval;
        self
    }

    /// Set the retention horizon
    pub fn retain(mut self, retain: Duration) -> Self {
        self.config.inmem.retain = retain;
        self
    }

    /// Set the service name prefix
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.config.service.service_name = name.into();
        self
    }

    /// Set the HTTP port
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http.port = port;
        self
    }

    /// Enable or disable the HTTP endpoint
    pub fn http_enabled(mut self, enabled: bool) -> Self {
        self.config.http.enabled = enabled;
        self
    }

    /// Set the dump file
    pub fn dump_file(mut self, path: PathBuf) -> Self {
        self.config.dump.file = Some(path);
        self
    }

    /// Enable or disable runtime metrics
    pub fn runtime_metrics(mut self, enabled: bool) -> Self {
        self.config.service.enable_runtime_metrics = enabled;
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_intervals(), 6);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::default();
        config.inmem.interval = Duration::ZERO;
        assert!(config.validate().is_err());
        assert_eq!(config.max_intervals(), 0);
    }

    #[test]
    fn test_retain_shorter_than_interval_rejected() {
        let result = ConfigBuilder::new()
            .interval(Duration::from_secs(10))
            .retain(Duration::from_secs(5))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_dump_interval_required_with_file() {
        let mut config = Config::default();
        config.dump.file = Some(PathBuf::from("metrics.out"));
        config.dump.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .interval(Duration::from_millis(100))
            .retain(Duration::from_secs(1))
            .service_name("checkout")
            .http_port(9200)
            .debug(true)
            .build()
            .unwrap();

        assert_eq!(config.inmem.interval, Duration::from_millis(100));
        assert_eq!(config.max_intervals(), 10);
        assert_eq!(config.service.service_name, "checkout");
        assert_eq!(config.http.port, 9200);
        assert!(config.debug);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
inmem:
  interval: 250ms
  retain: 5s
service:
  service_name: billing
  enable_type_suffix: true
  timer_granularity: 1us
http:
  port: 9300
dump:
  file: /tmp/strata.out
  interval: 2s
logging:
  level: debug
"#;

        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();

        assert_eq!(config.inmem.interval, Duration::from_millis(250));
        assert_eq!(config.inmem.retain, Duration::from_secs(5));
        assert_eq!(config.max_intervals(), 20);
        assert_eq!(config.service.service_name, "billing");
        assert!(config.service.enable_type_suffix);
        assert!(config.service.enable_service_name);
        assert_eq!(config.service.timer_granularity, Duration::from_micros(1));
        assert_eq!(config.http.port, 9300);
        assert_eq!(config.dump.file, Some(PathBuf::from("/tmp/strata.out")));
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_plain_service_config() {
        let plain = MetricServiceConfig::plain();
        assert!(!plain.enable_service_name);
        assert!(!plain.enable_runtime_metrics);
        assert!(plain.service_name.is_empty());
    }
}
