//! Configuration system tests.

use std::path::PathBuf;
use std::time::Duration;
use strata_lib::core::config::LogLevel;
use strata_lib::core::{Config, ConfigBuilder};

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.inmem.interval, Duration::from_secs(10));
    assert_eq!(config.inmem.retain, Duration::from_secs(60));
    assert_eq!(config.service.service_name, "strata");
    assert_eq!(config.service.timer_granularity, Duration::from_millis(1));
    assert_eq!(config.service.profile_interval, Duration::from_secs(3));
    assert!(config.service.enable_service_name);
    assert!(!config.service.enable_host_name);
    assert!(!config.service.enable_type_suffix);
    assert!(config.service.enable_runtime_metrics);
    assert!(config.http.enabled);
    assert_eq!(config.http.port, 9102);
    assert!(config.dump.file.is_none());
    assert!(config.dump.signal);
    assert_eq!(config.logging.level, LogLevel::Info);
}

#[test]
fn test_config_builder() {
    let config = ConfigBuilder::new()
        .interval(Duration::from_secs(1))
        .retain(Duration::from_secs(30))
        .service_name("payments")
        .http_port(9200)
        .dump_file(PathBuf::from("metrics.out"))
        .runtime_metrics(false)
        .debug(true)
        .build()
        .unwrap();

    assert_eq!(config.max_intervals(), 30);
    assert_eq!(config.service.service_name, "payments");
    assert_eq!(config.http.port, 9200);
    assert_eq!(config.dump.file, Some(PathBuf::from("metrics.out")));
    assert!(!config.service.enable_runtime_metrics);
    assert!(config.debug);
}

#[test]
fn test_yaml_config() {
    let yaml = r#"
inmem:
  interval: 500ms
  retain: 1m
service:
  host_name: web-1
  service_name: frontend
  enable_host_name: true
  enable_type_suffix: true
  enable_runtime_metrics: false
http:
  enabled: true
  bind_address: 0.0.0.0
  port: 9400
  enable_cors: true
dump:
  signal: false
logging:
  level: warn
"#;

    let config = ConfigBuilder::new()
        .from_yaml(yaml)
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(config.inmem.interval, Duration::from_millis(500));
    assert_eq!(config.max_intervals(), 120);
    assert_eq!(config.service.host_name.as_deref(), Some("web-1"));
    assert!(config.service.enable_host_name);
    assert!(config.service.enable_type_suffix);
    assert_eq!(config.http.bind_address.to_string(), "0.0.0.0");
    assert!(config.http.enable_cors);
    assert!(!config.dump.signal);
    assert_eq!(config.logging.level, LogLevel::Warn);
    // Unset sections keep their defaults
    assert_eq!(config.service.timer_granularity, Duration::from_millis(1));
}

#[test]
fn test_config_validation() {
    let valid_config = Config::default();
    assert!(valid_config.validate().is_ok());

    let zero_interval = ConfigBuilder::new().interval(Duration::ZERO).build();
    assert!(zero_interval.is_err());

    let short_retain = ConfigBuilder::new()
        .interval(Duration::from_secs(10))
        .retain(Duration::from_secs(1))
        .build();
    assert!(short_retain.is_err());

    let mut config = Config::default();
    config.service.timer_granularity = Duration::ZERO;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.service.profile_interval = Duration::ZERO;
    assert!(config.validate().is_err());
    config.service.enable_runtime_metrics = false;
    assert!(config.validate().is_ok());
}

#[test]
fn test_error_handling() {
    let result = ConfigBuilder::new().from_yaml("invalid: yaml: content: [");
    assert!(result.is_err());

    let result = ConfigBuilder::new().from_yaml(
        r#"
inmem:
  interval: "not a duration"
"#,
    );
    assert!(result.is_err());
}
