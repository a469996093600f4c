// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Settings come from an optional YAML file, then command-line flags and
//! environment variables override individual values. Missing values fall back
//! to the defaults below, and the result is validated once at startup.
//!
//! Unknown keys in the file are rejected. Durations are whole seconds or
//! strings such as `25h` and `1h30m`.

use crate::error::ConfigError;
use crate::template::{EmailTemplate, DEFAULT_TEMPLATE};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:80)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    /// Listening port; replaces the port of `bind_addr` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Upstream SMTP server
    #[serde(default)]
    pub mailserver: MailServerConfig,

    /// Address receiving every message
    #[serde(default)]
    pub mailbox: String,

    /// Message formatting
    #[serde(default)]
    pub email: EmailConfig,

    /// Log file; logs go to standard output when unset
    #[serde(default)]
    pub log: Option<PathBuf>,

    /// Rate limiting configuration
    #[serde(default, alias = "ratelimit")]
    pub rate_limit: RateLimitConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Upstream SMTP server settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailServerConfig {
    /// Server address with port, e.g. smtp.gmail.com:587
    #[serde(default)]
    pub address: String,

    /// Authentication username (default: the mailbox)
    #[serde(default)]
    pub username: String,

    /// Authentication password
    #[serde(default)]
    pub password: String,
}

/// Message formatting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// Prefix prepended to every subject (default: "[ContactMe] ")
    #[serde(default = "default_subject_prefix", alias = "subject prefix")]
    pub subject_prefix: String,

    /// Body template with {{.ClientName}} and {{.Message}} fields
    #[serde(default = "default_template")]
    pub template: String,
}

/// Token bucket settings, shared by every client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Bucket capacity in tokens (default: 5)
    #[serde(default = "default_burst")]
    pub burst: f64,

    /// Tokens refilled per second (default: 0.00035, about one per 47.6 min)
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Idle time after which a client's bucket is dropped (default: 25h)
    #[serde(
        default = "default_expires_secs",
        alias = "expires",
        deserialize_with = "deserialize_secs"
    )]
    pub expires_secs: u64,

    /// Time between reclaimer sweeps (default: 5 min)
    #[serde(
        default = "default_cleanup_secs",
        alias = "cleanup",
        deserialize_with = "deserialize_secs"
    )]
    pub cleanup_secs: u64,
}

/// CORS settings for the contact endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
    /// Send CORS headers (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Value of Access-Control-Allow-Origin (default: *)
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub port: Option<String>,
    pub mailserver: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub mailbox: Option<String>,
}

// Default value functions
fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 80))
}

fn default_subject_prefix() -> String {
    "[ContactMe] ".to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_burst() -> f64 {
    5.0
}

fn default_rate() -> f64 {
    0.00035
}

fn default_expires_secs() -> u64 {
    25 * 60 * 60
}

fn default_cleanup_secs() -> u64 {
    5 * 60
}

fn default_true() -> bool {
    true
}

fn default_allow_origin() -> String {
    "*".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Count(u64),
    Text(String),
}

fn deserialize_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Seconds::deserialize(deserializer)? {
        Seconds::Count(secs) => Ok(secs),
        Seconds::Text(text) => parse_duration_secs(&text)
            .ok_or_else(|| de::Error::custom(format!("invalid duration {text:?}"))),
    }
}

/// Parse `<n>h`, `<n>m` and `<n>s` groups, e.g. `1h30m`, into seconds.
fn parse_duration_secs(text: &str) -> Option<u64> {
    let mut rest = text.trim();
    if rest.is_empty() {
        return None;
    }

    let mut total: u64 = 0;
    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let value: u64 = rest[..digits].parse().ok()?;
        rest = &rest[digits..];

        let unit = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let scale = match &rest[..unit] {
            "h" => 3600,
            "m" => 60,
            "s" => 1,
            _ => return None,
        };
        total = total.checked_add(value.checked_mul(scale)?)?;
        rest = &rest[unit..];
    }
    Some(total)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: None,
            mailserver: MailServerConfig::default(),
            mailbox: String::new(),
            email: EmailConfig::default(),
            log: None,
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            subject_prefix: default_subject_prefix(),
            template: default_template(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst: default_burst(),
            rate: default_rate(),
            expires_secs: default_expires_secs(),
            cleanup_secs: default_cleanup_secs(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            allow_origin: default_allow_origin(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the bucket expiry duration
    pub fn expires(&self) -> Duration {
        Duration::from_secs(self.expires_secs)
    }

    /// Get the reclaimer sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_secs)
    }

    fn fill_defaults(&mut self) {
        if !(self.burst.is_finite() && self.burst > 0.0) {
            self.burst = default_burst();
        }
        if !(self.rate.is_finite() && self.rate > 0.0) {
            self.rate = default_rate();
        }
        if self.expires_secs == 0 {
            self.expires_secs = default_expires_secs();
        }
        if self.cleanup_secs == 0 {
            self.cleanup_secs = default_cleanup_secs();
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
        config.apply_file_port();
        Ok(config)
    }

    fn apply_file_port(&mut self) {
        if let Some(port) = self.port.take() {
            self.bind_addr.set_port(port);
        }
    }

    /// Build the effective configuration: file, then overrides, then
    /// defaults, then validation.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = match &overrides.config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(overrides)?;
        config.fill_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line and environment values over the current settings.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(port) = overrides.port.as_deref().filter(|p| !p.is_empty()) {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(port.to_string()))?;
            self.bind_addr.set_port(port);
        }

        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        if let Some(address) = non_empty(&overrides.mailserver) {
            self.mailserver.address = address;
        }
        if let Some(username) = non_empty(&overrides.username) {
            self.mailserver.username = username;
        }
        if let Some(password) = non_empty(&overrides.password) {
            self.mailserver.password = password;
        }
        if let Some(mailbox) = non_empty(&overrides.mailbox) {
            self.mailbox = mailbox;
        }
        Ok(())
    }

    /// Replace empty or zero values with their defaults.
    pub fn fill_defaults(&mut self) {
        self.apply_file_port();
        if self.bind_addr.port() == 0 {
            self.bind_addr.set_port(default_bind_addr().port());
        }

        self.mailserver.address = self.mailserver.address.trim().to_string();
        self.mailbox = self.mailbox.trim().to_string();

        self.mailserver.username = self.mailserver.username.trim().to_string();
        if self.mailserver.username.is_empty() {
            self.mailserver.username = self.mailbox.clone();
        }

        if self.email.template.trim().is_empty() {
            self.email.template = default_template();
        }

        self.log = self
            .log
            .take()
            .filter(|path| !path.as_os_str().is_empty());

        self.rate_limit.fill_defaults();
    }

    /// Check that the relay can run with these settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mailserver.address.is_empty() || self.mailbox.is_empty() {
            return Err(ConfigError::MissingParameters);
        }

        if self.mailbox.parse::<lettre::Address>().is_err() {
            return Err(ConfigError::InvalidMailbox(self.mailbox.clone()));
        }

        EmailTemplate::parse(&self.email.template)?;
        Ok(())
    }
}
