//! # Configuration
//!
//! Two layers:
//!
//! - [`Settings`] - service settings loaded from YAML, with `BRRTBIND_*` environment
//!   overrides. The transport and logging setup read them; the binder does not.
//! - [`RuntimeConfig`] - binder knobs read straight from the environment.
//!
//! ## Settings File
//!
//! ```yaml
//! host: 0.0.0.0
//! port: 8080
//! mode: prod
//! environment: staging
//! cors_origins:
//!   - https://app.example.com
//! logger:
//!   file: /var/log/svc/app.log
//!   rotation: daily
//! ```
//!
//! Every key is optional. `envornment` is accepted as an alias of `environment` so that
//! settings files written for older deployments still load.
//!
//! ## Environment Variables
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `BRRTBIND_HOST` | `host` |
//! | `BRRTBIND_PORT` | `port` |
//! | `BRRTBIND_MODE` | `mode` (`debug` / `prod`) |
//! | `BRRTBIND_ENVIRONMENT` | `environment` |
//! | `BRRTBIND_AUTO_RELOAD` | `auto_reload` |
//! | `BRRTBIND_ACCESS_LOG` | `access_log` |
//! | `BRRTBIND_CORS_ORIGINS` | `cors_origins` (comma separated) |
//! | `BRRTBIND_SCHEMA_CACHE` | [`RuntimeConfig::schema_cache`] |
//! | `BRRTBIND_LAX_COERCION` | [`RuntimeConfig::lax_coercion`] |

use crate::described_enum;
use crate::descriptor::DescribedEnum;
use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

described_enum! {
    /// Service run mode
    pub enum RunMode: &'static str {
        Debug = ("debug", "development mode"),
        Production = ("prod", "production mode"),
    }
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Debug
    }
}

impl RunMode {
    /// Look a mode up by its wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::variants()
            .iter()
            .copied()
            .find(|m| m.value().eq_ignore_ascii_case(value.trim()))
    }
}

/// File logging settings.
///
/// `retention`, `compression` and `loki_url` are carried for deployment tooling; log
/// shipping is not performed by this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSettings {
    pub file: Option<PathBuf>,
    /// `never`, `minutely`, `hourly` or `daily`
    pub rotation: Option<String>,
    pub retention: Option<String>,
    pub compression: Option<String>,
    pub loki_url: Option<Url>,
}

/// Service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub mode: RunMode,
    /// Deployment label only. Branch on `mode`, not on this.
    #[serde(alias = "envornment")]
    pub environment: String,
    /// Forced off in production mode.
    pub auto_reload: bool,
    pub access_log: bool,
    #[serde(deserialize_with = "null_as_empty")]
    pub cors_origins: Vec<String>,
    pub sentry_dsn: Option<Url>,
    pub logger: LoggerSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6969,
            mode: RunMode::Debug,
            environment: "dev".to_string(),
            auto_reload: false,
            access_log: true,
            cors_origins: Vec::new(),
            sentry_dsn: None,
            logger: LoggerSettings::default(),
        }
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl Settings {
    /// Parse YAML text. An empty document yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a YAML file, apply environment overrides and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_yaml_str(&text)?;
        settings.apply_env()?;
        settings.validate()?;
        info!(
            path = %path.display(),
            mode = %settings.mode,
            environment = %settings.environment,
            "Settings loaded"
        );
        Ok(settings)
    }

    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| env::var(key).ok())
    }

    /// Apply `BRRTBIND_*` overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BRRTBIND_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("BRRTBIND_PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                field: "port",
                message: format!("{port:?} is not a port number"),
            })?;
        }
        if let Some(mode) = lookup("BRRTBIND_MODE") {
            self.mode = RunMode::parse(&mode).ok_or_else(|| ConfigError::Invalid {
                field: "mode",
                message: format!("{mode:?} is not one of {}", RunMode::to_desc()),
            })?;
        }
        if let Some(environment) = lookup("BRRTBIND_ENVIRONMENT") {
            self.environment = environment;
        }
        if let Some(flag) = lookup("BRRTBIND_AUTO_RELOAD") {
            self.auto_reload = parse_flag(&flag).ok_or_else(|| invalid_flag("auto_reload", &flag))?;
        }
        if let Some(flag) = lookup("BRRTBIND_ACCESS_LOG") {
            self.access_log = parse_flag(&flag).ok_or_else(|| invalid_flag("access_log", &flag))?;
        }
        if let Some(origins) = lookup("BRRTBIND_CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        debug!(mode = %self.mode, port = self.port, "Environment overrides applied");
        Ok(())
    }

    /// Reject settings a service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "host",
                message: "must not be empty".to_string(),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "port",
                message: "must be between 1 and 65535".to_string(),
            });
        }
        check_http_url("sentry_dsn", self.sentry_dsn.as_ref())?;
        check_http_url("logger.loki_url", self.logger.loki_url.as_ref())?;
        if let Some(rotation) = &self.logger.rotation {
            crate::logging::Rotation::parse(rotation).ok_or_else(|| ConfigError::Invalid {
                field: "logger.rotation",
                message: format!("{rotation:?} is not one of never, minutely, hourly, daily"),
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.mode == RunMode::Debug
    }

    #[must_use]
    pub fn effective_auto_reload(&self) -> bool {
        self.is_debug() && self.auto_reload
    }

    /// 1 in debug mode, one per available core in production.
    #[must_use]
    pub fn workers(&self) -> usize {
        if self.is_debug() {
            1
        } else {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        }
    }

    /// `Access-Control-Allow-Origin` value: any origin in debug mode, the configured list
    /// otherwise.
    #[must_use]
    pub fn cors_allow_origin(&self) -> String {
        if self.is_debug() {
            "*".to_string()
        } else {
            self.cors_origins.join(",")
        }
    }
}

fn check_http_url(field: &'static str, url: Option<&Url>) -> Result<(), ConfigError> {
    match url {
        Some(url) if !matches!(url.scheme(), "http" | "https") => Err(ConfigError::Invalid {
            field,
            message: format!("{url} is not an http(s) URL"),
        }),
        _ => Ok(()),
    }
}

fn invalid_flag(field: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: format!("{value:?} is not a boolean"),
    }
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Binder knobs loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Cache compiled schema validators (default: on)
    pub schema_cache: bool,
    /// Coerce textual scalars before validation (default: on)
    pub lax_coercion: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            schema_cache: true,
            lax_coercion: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(default)
        };
        Self {
            schema_cache: flag("BRRTBIND_SCHEMA_CACHE", defaults.schema_cache),
            lax_coercion: flag("BRRTBIND_LAX_COERCION", defaults.lax_coercion),
        }
    }
}
