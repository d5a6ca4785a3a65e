//! Command-line interface for strata.
//!
//! Runs an in-memory aggregator with the HTTP display endpoint, runtime
//! metrics and the dumpers. Just run `strata` to start with sensible
//! defaults.

use crate::api;
use crate::core::config::{ConfigBuilder, LogLevel};
use crate::core::{Config, Result, StrataError};
use crate::dump::{FileDumper, SignalDumper};
use crate::global;
use crate::metrics::InmemSink;
use crate::sink::Sink;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// In-memory metrics aggregator with an HTTP display endpoint
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (default: ~/.config/strata/config.yaml)
    #[arg(short, long, env = "STRATA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Aggregation interval, e.g. 10s
    #[arg(long, env = "STRATA_INTERVAL", value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// History kept, e.g. 1m
    #[arg(long, env = "STRATA_RETAIN", value_parser = humantime::parse_duration)]
    pub retain: Option<Duration>,

    /// HTTP port for the display endpoint
    #[arg(short, long, env = "STRATA_PORT")]
    pub port: Option<u16>,

    /// Periodically write the current interval to this file
    #[arg(long, env = "STRATA_DUMP_FILE")]
    pub dump_file: Option<PathBuf>,

    /// Do not serve the HTTP display endpoint
    #[arg(long, env = "STRATA_NO_HTTP")]
    pub no_http: bool,

    /// Enable debug logging
    #[arg(short, long, env = "STRATA_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        let mut builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            path.clone()
        } else {
            let default_path = dirs::config_dir()
                .map(|d| d.join("strata").join("config.yaml"))
                .unwrap_or_else(|| PathBuf::from("~/.config/strata/config.yaml"));

            if default_path.exists() {
                default_path
            } else {
                return self.build_config_from_args(builder);
            }
        };

        match tokio::fs::read_to_string(&config_path).await {
            Ok(content) => {
                builder = builder.from_yaml(&content)?;
            }
            Err(e) if self.config.is_some() => {
                // An explicitly requested file must exist
                return Err(StrataError::config(format!(
                    "Failed to read config file {:?}: {}",
                    config_path, e
                )));
            }
            Err(_) => {}
        }

        self.build_config_from_args(builder)
    }

    fn build_config_from_args(&self, mut builder: ConfigBuilder) -> Result<Config> {
        if let Some(interval) = self.interval {
            builder = builder.interval(interval);
        }
        if let Some(retain) = self.retain {
            builder = builder.retain(retain);
        }
        if let Some(port) = self.port {
            builder = builder.http_port(port);
        }
        if let Some(path) = &self.dump_file {
            builder = builder.dump_file(path.clone());
        }
        if self.no_http {
            builder = builder.http_enabled(false);
        }

        builder.debug(self.debug).build()
    }

    /// Initialize logging.
    ///
    /// `RUST_LOG` wins, then `STRATA_LOG_LEVEL`, then the configured level.
    /// `--debug` forces debug.
    pub fn init_logging(&self, level: LogLevel) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let log_level = if self.debug {
            LogLevel::Debug.as_str().to_string()
        } else {
            std::env::var("STRATA_LOG_LEVEL").unwrap_or_else(|_| level.as_str().to_string())
        };

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(self.debug)
            .with_line_number(self.debug)
            .compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| StrataError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the strata application.
pub async fn execute(cli: Cli) -> Result<()> {
    let config = cli.load_config().await?;

    if cli.check_config {
        println!("Configuration is valid!");
        println!("  Interval: {}", humantime::format_duration(config.inmem.interval));
        println!("  Retain: {}", humantime::format_duration(config.inmem.retain));
        println!("  Intervals kept: {}", config.max_intervals());
        println!("  Service name: {}", config.service.service_name);
        if config.http.enabled {
            println!("  HTTP: {}:{}", config.http.bind_address, config.http.port);
        } else {
            println!("  HTTP: disabled");
        }
        if let Some(path) = &config.dump.file {
            println!("  Dump file: {}", path.display());
        }
        return Ok(());
    }

    cli.init_logging(config.logging.level)?;
    tracing::info!(config = ?cli.config, "Starting strata...");
    run(config).await
}

struct Server {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<()>>,
}

async fn run(config: Config) -> Result<()> {
    let sink = Arc::new(InmemSink::from_config(&config.inmem)?);
    let service = global::init_global(config.service.clone(), Arc::clone(&sink) as Arc<dyn Sink>)?;
    let runtime_metrics = service.start_runtime_metrics();

    let signal_dumper = if config.dump.signal {
        Some(SignalDumper::spawn_stderr(Arc::clone(&sink))?)
    } else {
        None
    };

    let file_dumper = config.dump.file.as_ref().map(|path| {
        tracing::info!("Dumping metrics to {} every {:?}", path.display(), config.dump.interval);
        FileDumper::spawn(Arc::clone(&sink), config.dump.interval, path)
    });

    let server = config.http.enabled.then(|| {
        let (stop, stopped) = oneshot::channel::<()>();
        let http = config.http.clone();
        let sink = Arc::clone(&sink);
        let handle = tokio::spawn(async move {
            api::start_server(sink, &http, async {
                let _ = stopped.await;
            })
            .await
        });
        Server { stop, handle }
    });

    tracing::info!(
        interval = ?config.inmem.interval,
        retain = ?config.inmem.retain,
        "strata running"
    );

    let result = wait_for_shutdown(server).await;

    if let Some(handle) = runtime_metrics {
        handle.abort();
    }
    if let Some(dumper) = &signal_dumper {
        dumper.shutdown().await?;
    }
    if let Some(dumper) = &file_dumper {
        dumper.shutdown().await?;
    }

    result
}

async fn wait_for_shutdown(server: Option<Server>) -> Result<()> {
    let Some(Server { stop, mut handle }) = server else {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Received shutdown signal, stopping...");
        return Ok(());
    };

    tokio::select! {
        joined = &mut handle => {
            // The server only returns on its own when it failed
            let result = joined?;
            if let Err(e) = &result {
                tracing::error!("HTTP server error: {}", e);
            }
            result
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Received shutdown signal, stopping...");
            let _ = stop.send(());
            handle.await?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["strata"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.interval.is_none());
        assert!(!cli.debug);
        assert!(!cli.no_http);
        assert!(!cli.check_config);
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "strata",
            "--interval",
            "250ms",
            "--retain",
            "5s",
            "--port",
            "9300",
            "--dump-file",
            "/tmp/strata.out",
            "--no-http",
            "--debug",
        ])
        .unwrap();

        let builder = ConfigBuilder::new()
            .from_yaml("inmem:\n  interval: 1s\n  retain: 10s\nservice:\n  service_name: api\n")
            .unwrap();
        let config = cli.build_config_from_args(builder).unwrap();

        assert_eq!(config.inmem.interval, Duration::from_millis(250));
        assert_eq!(config.inmem.retain, Duration::from_secs(5));
        assert_eq!(config.http.port, 9300);
        assert!(!config.http.enabled);
        assert_eq!(config.dump.file, Some(PathBuf::from("/tmp/strata.out")));
        assert_eq!(config.service.service_name, "api");
        assert!(config.debug);
    }

    #[test]
    fn test_invalid_duration_flag_rejected() {
        assert!(Cli::try_parse_from(["strata", "--interval", "often"]).is_err());
    }

    #[test]
    fn test_invalid_combination_rejected() {
        let cli = Cli::try_parse_from(["strata", "--interval", "1m", "--retain", "10s"]).unwrap();
        assert!(cli.build_config_from_args(ConfigBuilder::new()).is_err());
    }

    #[tokio::test]
    async fn test_missing_explicit_config_file_is_an_error() {
        let cli = Cli::try_parse_from(["strata", "--config", "/nonexistent/strata.yaml"]).unwrap();
        assert!(matches!(cli.load_config().await, Err(StrataError::Config(_))));
    }

    #[tokio::test]
    async fn test_config_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "inmem:\n  interval: 2s\n  retain: 20s\n").unwrap();

        let cli = Cli::try_parse_from(["strata", "--config", path.to_str().unwrap()]).unwrap();
        let config = cli.load_config().await.unwrap();
        assert_eq!(config.max_intervals(), 10);
    }
}
