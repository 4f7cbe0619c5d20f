//! Configuration management for zprogress.
//!
//! This module handles loading, merging, and validating configuration from files,
//! the environment and CLI arguments. It supports YAML, JSON, and TOML formats.
//!
//! Precedence: CLI > environment > config file > defaults.

use crate::cli::{Args, ConfigFormat};
use crate::monitor::{MonitorSettings, DEFAULT_BAR_WIDTH};
use crate::process::DEFAULT_PROC_ROOT;
use crate::rate::RatePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_INTERVAL_SECONDS: f64 = 0.1;
pub const MAX_BAR_WIDTH: usize = 500;
pub const DEFAULT_LOG_LEVEL: &str = "warn";

pub const ENV_INTERVAL: &str = "ZPROGRESS_INTERVAL";
pub const ENV_BAR_WIDTH: &str = "ZPROGRESS_BAR_WIDTH";
pub const ENV_NO_COLOR: &str = "ZPROGRESS_NO_COLOR";
pub const ENV_RATE_POLICY: &str = "ZPROGRESS_RATE_POLICY";
/// See <https://no-color.org>.
pub const ENV_NO_COLOR_CONVENTION: &str = "NO_COLOR";

const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "/etc/zprogress/config.yaml",
    "/etc/zprogress/config.yml",
    "./zprogress.yaml",
    "./zprogress.yml",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The io error is only kept as the source, never in the message.
    #[error("Failed to read config file {path}: not readable")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value {value:?} in {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0}")]
    Invalid(String),

    #[error("Failed to serialize config: {0}")]
    Serialize(String),
}

/// Effective configuration. Missing file keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between samples
    #[serde(alias = "interval-seconds", alias = "interval")]
    pub interval_seconds: Option<f64>,
    /// Progress bar width in cells
    #[serde(alias = "bar-width")]
    pub bar_width: Option<usize>,
    #[serde(alias = "no-color")]
    pub no_color: Option<bool>,
    /// "cumulative" | "windowed"
    #[serde(alias = "rate-policy")]
    pub rate_policy: Option<RatePolicy>,
    /// Run gzip/xz/zstd listings to learn the uncompressed size
    #[serde(alias = "query-archive-sizes")]
    pub query_archive_sizes: Option<bool>,
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
    #[serde(alias = "log-file")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_seconds: Some(DEFAULT_INTERVAL_SECONDS),
            bar_width: Some(DEFAULT_BAR_WIDTH),
            no_color: Some(false),
            rate_policy: Some(RatePolicy::default()),
            query_archive_sizes: Some(true),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            log_level: Some(DEFAULT_LOG_LEVEL.into()),
            log_file: None,
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        self.interval_seconds
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_INTERVAL_SECONDS))
    }

    pub fn color_enabled(&self) -> bool {
        !self.no_color.unwrap_or(false)
    }

    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    /// Settings for the monitors. Call after [`validate_effective_config`].
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            interval: self.interval(),
            bar_width: self.bar_width.unwrap_or(DEFAULT_BAR_WIDTH),
            rate_policy: self.rate_policy.unwrap_or_default(),
            probe_sizes: self.query_archive_sizes.unwrap_or(true),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(interval) = cfg.interval_seconds {
        if !interval.is_finite() || interval <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "interval_seconds must be a positive number, got {}",
                interval
            )));
        }
    }

    if let Some(width) = cfg.bar_width {
        if !(1..=MAX_BAR_WIDTH).contains(&width) {
            return Err(ConfigError::Invalid(format!(
                "bar_width must be between 1 and {}, got {}",
                MAX_BAR_WIDTH, width
            )));
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        parse_log_level(level)?;
    }

    Ok(())
}

/// Parses a log level name as accepted by `--log-level`.
pub fn parse_log_level(level: &str) -> Result<crate::cli::LogLevel, ConfigError> {
    <crate::cli::LogLevel as clap::ValueEnum>::from_str(level.trim(), true).map_err(|_| {
        ConfigError::Invalid(format!(
            "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
            level
        ))
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            var,
            value: value.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

/// Applies `ZPROGRESS_*` and `NO_COLOR` from `lookup`.
pub fn apply_env_overrides<F>(mut config: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_INTERVAL) {
        let seconds = value.trim().parse::<f64>().map_err(|e| ConfigError::Env {
            var: ENV_INTERVAL,
            value: value.clone(),
            reason: e.to_string(),
        })?;
        config.interval_seconds = Some(seconds);
    }

    if let Some(value) = lookup(ENV_BAR_WIDTH) {
        let width = value.trim().parse::<usize>().map_err(|e| ConfigError::Env {
            var: ENV_BAR_WIDTH,
            value: value.clone(),
            reason: e.to_string(),
        })?;
        config.bar_width = Some(width);
    }

    if let Some(value) = lookup(ENV_RATE_POLICY) {
        let policy = value.parse::<RatePolicy>().map_err(|reason| ConfigError::Env {
            var: ENV_RATE_POLICY,
            value: value.clone(),
            reason,
        })?;
        config.rate_policy = Some(policy);
    }

    if let Some(value) = lookup(ENV_NO_COLOR) {
        config.no_color = Some(parse_flag(ENV_NO_COLOR, &value)?);
    }

    // Any non-empty NO_COLOR disables colour.
    if lookup(ENV_NO_COLOR_CONVENTION).is_some_and(|v| !v.is_empty()) {
        config.no_color = Some(true);
    }

    Ok(config)
}

/// Resolves configuration from CLI args, the process environment, config file, and defaults.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    resolve_config_with_env(args, |key| std::env::var(key).ok())
}

/// [`resolve_config`] with an explicit environment.
pub fn resolve_config_with_env<F>(args: &Args, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    let mut config = apply_env_overrides(config, lookup)?;

    if let Some(interval) = args.interval {
        config.interval_seconds = Some(interval);
    }
    if let Some(width) = args.bar_width {
        config.bar_width = Some(width);
    }
    if args.no_color {
        config.no_color = Some(true);
    }
    if let Some(policy) = args.rate_policy {
        config.rate_policy = Some(policy);
    }
    if args.no_size_probe {
        config.query_archive_sizes = Some(false);
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }

    Ok(config)
}

/// Loads `path`, or the first default location that exists, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
            Some(p) => p.to_path_buf(),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let parse_error = |message: String| ConfigError::Parse {
        path: path.clone(),
        message,
    };

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
    };

    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, ConfigError> {
    match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config).map_err(|e| e.to_string()),
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(|e| e.to_string()),
        ConfigFormat::Yaml => serde_yaml::to_string(config).map_err(|e| e.to_string()),
    }
    .map_err(ConfigError::Serialize)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), ConfigError> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
