//! YAML configuration.
//!
//! # Resolution
//!
//! The config file path is, in order: an explicit path (CLI `--config`), the
//! `CONFIG_PATH` environment variable, then `sf_conf.yml` in the working
//! directory.
//!
//! # Layout
//!
//! ```yaml
//! targets:
//!   - url: 10.0.0.6
//!     poll_interval: 30
//!     auth:
//!       client_id: admin
//!       client_secret: secret
//!     ca_cert: |
//!       -----BEGIN CERTIFICATE-----
//!       ...
//!     insecure_skip_verify: false
//! rules:
//!   - match: '.*-(.*)'
//!   - match: '(.*)'
//! log:
//!   level: info
//!   json: false
//! server:
//!   socket: /run/signalfire.sock
//! ```
//!
//! Unknown keys are ignored so older files with extra sections still load.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::rule::{RuleSet, IDENTITY_PATTERN, SUFFIX_PATTERN};

pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "sf_conf.yml";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    /// Ordered grouping rules; absent means the built-in defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RuleConfig>>,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// One director to poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub url: String,
    /// Seconds between polls; `0` or absent means the default.
    #[serde(default)]
    pub poll_interval: u64,
    #[serde(default)]
    pub auth: TargetAuth,
    /// PEM CA certificate to trust instead of the system roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<String>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl TargetConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            poll_interval: 0,
            auth: TargetAuth::default(),
            ca_cert: None,
            insecure_skip_verify: false,
        }
    }

    /// The configured CA certificate, ignoring a blank value.
    pub fn ca_cert(&self) -> Option<&str> {
        self.ca_cert.as_deref().filter(|pem| !pem.trim().is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        match self.poll_interval {
            0 => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            secs => Duration::from_secs(secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TargetAuth {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(rename = "match")]
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit newline-delimited JSON log records instead of text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    LogLevel::Info.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Unix socket the daemon serves on. Defaults to a path under `$HOME`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,
}

/// Accepted `log.level` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Error,
    Fatal,
}

impl LogLevel {
    /// The `tracing` filter directive for this level. `fatal` has no tracing
    /// counterpart and maps to `error`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error | LogLevel::Fatal => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Fatal => write!(f, "fatal"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "error" => Ok(LogLevel::Error),
            "fatal" => Ok(LogLevel::Fatal),
            other => Err(CoreError::InvalidConfig(format!(
                "unknown log level '{other}'; expected: debug, info, error, fatal"
            ))),
        }
    }
}

impl Config {
    /// The effective rule patterns, in evaluation order.
    pub fn rule_patterns(&self) -> Vec<String> {
        match &self.rules {
            Some(rules) => rules.iter().map(|rule| rule.pattern.clone()).collect(),
            None => vec![SUFFIX_PATTERN.to_owned(), IDENTITY_PATTERN.to_owned()],
        }
    }

    pub fn rule_set(&self) -> Result<RuleSet, CoreError> {
        match &self.rules {
            Some(_) => RuleSet::from_patterns(&self.rule_patterns()),
            None => Ok(RuleSet::default()),
        }
    }

    pub fn log_level(&self) -> Result<LogLevel, CoreError> {
        self.log.level.parse()
    }

    /// Check everything that can be checked without talking to a director.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (idx, target) in self.targets.iter().enumerate() {
            if target.url.trim().is_empty() {
                return Err(CoreError::InvalidConfig(format!(
                    "targets[{idx}]: url must not be empty"
                )));
            }
        }

        if let Some(rules) = &self.rules {
            if rules.is_empty() {
                return Err(CoreError::InvalidConfig(
                    "rules: list is empty; omit it to use the defaults".to_owned(),
                ));
            }
            for (idx, rule) in rules.iter().enumerate() {
                RuleSet::from_patterns(&[rule.pattern.as_str()]).map_err(|err| {
                    CoreError::InvalidConfig(format!("rules[{idx}]: {err}"))
                })?;
            }
        }

        self.log_level()?;
        Ok(())
    }
}

/// Pick the config file path: explicit, then `$CONFIG_PATH`, then the default.
pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

/// Parse and validate config text. `path` is only used for error context.
pub fn parse(contents: &str, path: &Path) -> Result<Config, CoreError> {
    let config: Config = serde_yaml::from_str(contents).map_err(|source| CoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

/// Read, parse, and validate the config file at `path`.
pub fn load_at(path: &Path) -> Result<Config, CoreError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse(&contents, path)
}
