//! Structured logging setup.
//!
//! All of the crate's events go through `tracing`; this module installs the subscriber a
//! service uses to see them:
//!
//! - an `EnvFilter` built from the configured level plus `RUST_LOG` and extra target
//!   directives
//! - JSON (production) or pretty (development) output on stdout
//! - optional file output through a rolling appender
//!
//! Both writers are non-blocking. Keep the returned [`LoggingGuard`] alive for the life of
//! the process, otherwise buffered lines are lost on exit.

use crate::config::{parse_flag, Settings};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Never,
    Minutely,
    Hourly,
    Daily,
}

impl Rotation {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "never" | "" => Some(Rotation::Never),
            "minutely" => Some(Rotation::Minutely),
            "hourly" => Some(Rotation::Hourly),
            "daily" => Some(Rotation::Daily),
            _ => None,
        }
    }

    fn to_appender(self) -> rolling::Rotation {
        match self {
            Rotation::Never => rolling::Rotation::NEVER,
            Rotation::Minutely => rolling::Rotation::MINUTELY,
            Rotation::Hourly => rolling::Rotation::HOURLY,
            Rotation::Daily => rolling::Rotation::DAILY,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Also write to this file when set
    pub file: Option<PathBuf>,
    pub rotation: Rotation,
    /// Extra filter directives (comma-separated), e.g. `brrtbind::binder=debug`
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            log_level: lookup("BRRTBIND_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format: LogFormat::parse(&lookup("BRRTBIND_LOG_FORMAT").unwrap_or_default()),
            file: lookup("BRRTBIND_LOG_FILE").map(PathBuf::from),
            rotation: lookup("BRRTBIND_LOG_ROTATION")
                .and_then(|s| Rotation::parse(&s))
                .unwrap_or(Rotation::Never),
            target_filter: lookup("BRRTBIND_LOG_TARGET_FILTER"),
            include_location: lookup("BRRTBIND_LOG_INCLUDE_LOCATION")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(false),
        }
    }

    /// Pretty debug output in debug mode, JSON info output in production, plus the
    /// settings' log file.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut config = if settings.is_debug() {
            Self::default_dev()
        } else {
            Self::default_prod()
        };
        config.file = settings.logger.file.clone();
        config.rotation = settings
            .logger
            .rotation
            .as_deref()
            .and_then(Rotation::parse)
            .unwrap_or(Rotation::Never);
        config
    }

    /// Create a default configuration for development
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            file: None,
            rotation: Rotation::Never,
            target_filter: None,
            include_location: true,
        }
    }

    /// Create a default production configuration
    #[must_use]
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            file: None,
            rotation: Rotation::Never,
            target_filter: None,
            include_location: false,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    /// `RUST_LOG` when set, the configured level otherwise, plus target directives.
    /// Invalid directives are skipped.
    #[must_use]
    pub fn build_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        if let Some(target_filter) = &self.target_filter {
            for directive in target_filter.split(',').map(str::trim) {
                if directive.is_empty() {
                    continue;
                }
                match directive.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

/// Flushes buffered log lines when dropped.
#[must_use = "dropping the guard stops log output"]
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

fn fmt_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(ansi)
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    }
}

fn file_appender(path: &Path, rotation: Rotation) -> Result<RollingFileAppender> {
    let prefix = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("log file path {} has no file name", path.display()))?;
    let directory = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    RollingFileAppender::builder()
        .rotation(rotation.to_appender())
        .filename_prefix(prefix)
        .build(&directory)
        .with_context(|| format!("Failed to open log file in {}", directory.display()))
}

/// Install the global subscriber.
///
/// Fails if the log file cannot be opened or a subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard> {
    let mut guards = Vec::with_capacity(2);
    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);

    let (stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    guards.push(stdout_guard);
    layers.push(fmt_layer(config, stdout, true));

    if let Some(path) = &config.file {
        let (file, file_guard) = tracing_appender::non_blocking(file_appender(path, config.rotation)?);
        guards.push(file_guard);
        layers.push(fmt_layer(config, file, false));
    }

    tracing_subscriber::registry()
        .with(layers.with_filter(config.build_filter()))
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(LoggingGuard { _guards: guards })
}

/// Install the subscriber described by service settings.
pub fn init_from_settings(settings: &Settings) -> Result<LoggingGuard> {
    init_logging(&LogConfig::from_settings(settings))
}
