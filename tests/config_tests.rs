use brrtbind::config::{RunMode, RuntimeConfig, Settings};
use brrtbind::descriptor::DescribedEnum;
use brrtbind::logging::{LogConfig, LogFormat, Rotation};
use brrtbind::ConfigError;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_yaml(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_yaml_file_loads() {
    let file = write_yaml(
        r#"
host: 0.0.0.0
port: 8080
mode: prod
environment: staging
cors_origins:
  - https://a.example.com
  - https://b.example.com
logger:
  file: /tmp/brrtbind/app.log
  rotation: daily
  loki_url: http://loki:3100
"#,
    );
    let settings = Settings::from_yaml_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
    settings.validate().unwrap();

    assert_eq!(settings.host, "0.0.0.0");
    assert_eq!(settings.port, 8080);
    assert_eq!(settings.mode, RunMode::Production);
    assert_eq!(settings.environment, "staging");
    assert!(!settings.is_debug());
    assert_eq!(
        settings.cors_allow_origin(),
        "https://a.example.com,https://b.example.com"
    );
    assert!(settings.workers() >= 1);
    assert_eq!(settings.logger.rotation.as_deref(), Some("daily"));
}

#[test]
fn test_load_reads_path() {
    let file = write_yaml("port: 7000\n");
    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.host, "127.0.0.1");
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Settings::load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.yaml"));
}

#[test]
fn test_legacy_environment_key_is_accepted() {
    let settings = Settings::from_yaml_str("envornment: qa\n").unwrap();
    assert_eq!(settings.environment, "qa");
}

#[test]
fn test_null_cors_origins_is_empty() {
    let settings = Settings::from_yaml_str("cors_origins: ~\nmode: prod\n").unwrap();
    assert!(settings.cors_origins.is_empty());
    assert_eq!(settings.cors_allow_origin(), "");
}

#[test]
fn test_empty_document_yields_defaults() {
    assert_eq!(Settings::from_yaml_str("  \n").unwrap(), Settings::default());
    let defaults = Settings::default();
    assert_eq!(defaults.port, 6969);
    assert!(defaults.is_debug());
    assert_eq!(defaults.workers(), 1);
    assert_eq!(defaults.cors_allow_origin(), "*");
}

#[test]
fn test_unknown_mode_is_parse_error() {
    let err = Settings::from_yaml_str("mode: turbo\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_non_http_sentry_dsn_is_invalid() {
    let settings = Settings::from_yaml_str("sentry_dsn: ftp://sentry.example.com/1\n").unwrap();
    let err = settings.validate().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "sentry_dsn", .. }));
}

#[test]
fn test_unknown_rotation_is_invalid() {
    let settings = Settings::from_yaml_str("logger:\n  rotation: 10 MB\n").unwrap();
    assert!(matches!(
        settings.validate(),
        Err(ConfigError::Invalid { field: "logger.rotation", .. })
    ));
}

#[test]
fn test_env_overrides_apply() {
    let mut settings = Settings::default();
    settings
        .apply_env_from(lookup(&[
            ("BRRTBIND_PORT", "9000"),
            ("BRRTBIND_MODE", "prod"),
            ("BRRTBIND_AUTO_RELOAD", "true"),
            ("BRRTBIND_CORS_ORIGINS", "https://x.io, ,https://y.io"),
        ]))
        .unwrap();
    assert_eq!(settings.port, 9000);
    assert_eq!(settings.mode, RunMode::Production);
    assert!(settings.auto_reload);
    assert!(!settings.effective_auto_reload());
    assert_eq!(settings.cors_origins, vec!["https://x.io", "https://y.io"]);
}

#[test]
fn test_bad_flag_override_is_rejected() {
    let mut settings = Settings::default();
    let err = settings
        .apply_env_from(lookup(&[("BRRTBIND_ACCESS_LOG", "maybe")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { field: "access_log", .. }));
}

#[test]
fn test_run_mode_descriptions() {
    assert_eq!(RunMode::list(), vec!["debug", "prod"]);
    assert_eq!(
        RunMode::to_desc(),
        r#"{"debug":"development mode","prod":"production mode"}"#
    );
}

#[test]
fn test_runtime_config_defaults() {
    let config = RuntimeConfig::from_lookup(|_| None);
    assert_eq!(config, RuntimeConfig::default());
    assert!(config.schema_cache && config.lax_coercion);
}

#[test]
fn test_log_config_from_lookup() {
    let config = LogConfig::from_lookup(lookup(&[
        ("BRRTBIND_LOG_LEVEL", "warn"),
        ("BRRTBIND_LOG_FORMAT", "pretty"),
        ("BRRTBIND_LOG_ROTATION", "hourly"),
        ("BRRTBIND_LOG_INCLUDE_LOCATION", "on"),
    ]));
    assert_eq!(config.log_level, "warn");
    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.rotation, Rotation::Hourly);
    assert!(config.include_location);
}

#[test]
fn test_log_config_follows_settings_mode() {
    let settings = Settings::from_yaml_str("mode: debug\n").unwrap();
    let config = LogConfig::from_settings(&settings);
    assert_eq!(config, LogConfig::default_dev());
}
