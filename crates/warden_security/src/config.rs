//! Configuration for the Warden security layer.
//!
//! Settings are layered, lowest precedence first:
//! - Bundled defaults (include_str! from warden.toml)
//! - `~/.config/warden/warden.toml`
//! - `./warden.toml`
//! - `WARDEN__<SECTION>__<KEY>` environment variables
//!
//! Every key accepts its snake_case name and the camelCase alias used by
//! older deployments (`ipWhitelist.allowedIps`, `rateLimit.perMinute`, ...).

use config::{Config, Environment, File, FileFormat};
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, instrument};
use warden_error::{ConfigError, WardenError, WardenResult};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../warden.toml");

fn default_per_minute() -> u32 {
    30
}

fn default_per_hour() -> u32 {
    100
}

fn default_idle_ttl_secs() -> u64 {
    3600
}

fn default_max_length() -> usize {
    4000
}

/// Source address allow-list.
///
/// # Example
///
/// ```toml
/// [ip_whitelist]
/// enabled = true
/// allowed_ips = ["10.0.0.1", "::1"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct IpWhitelistConfig {
    /// Whether the allow-list is enforced
    #[serde(default)]
    enabled: bool,

    /// Exact IPv4/IPv6 literals admitted when enabled
    #[serde(default, alias = "allowedIps")]
    allowed_ips: BTreeSet<String>,
}

/// Per-principal token bucket capacities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct RateLimitConfig {
    /// Requests admitted per rolling minute
    #[serde(default = "default_per_minute", alias = "perMinute")]
    per_minute: u32,

    /// Requests admitted per rolling hour
    #[serde(default = "default_per_hour", alias = "perHour")]
    per_hour: u32,

    /// Seconds of inactivity before a principal's buckets are evicted
    #[serde(default = "default_idle_ttl_secs", alias = "idleTtlSecs")]
    idle_ttl_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            per_hour: default_per_hour(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

/// Input sanitizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct SanitizerConfig {
    /// Maximum sanitized length in bytes
    #[serde(default = "default_max_length", alias = "maxLength")]
    max_length: usize,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
        }
    }
}

/// Audit sink settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct AuditConfig {
    /// Append-only JSONL file; records stay in memory when unset
    #[serde(default, alias = "logPath", skip_serializing_if = "Option::is_none")]
    log_path: Option<PathBuf>,
}

/// Root configuration for the security layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[setters(prefix = "with_")]
pub struct WardenConfig {
    /// IP allow-list
    #[serde(default, alias = "ipWhitelist")]
    ip_whitelist: IpWhitelistConfig,

    /// Rate limits
    #[serde(default, alias = "rateLimit")]
    rate_limit: RateLimitConfig,

    /// Sanitizer
    #[serde(default)]
    sanitizer: SanitizerConfig,

    /// Audit sink
    #[serde(default)]
    audit: AuditConfig,
}

impl WardenConfig {
    /// Load configuration from a specific file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> WardenResult<Self> {
        debug!("Loading configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                WardenError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                WardenError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(source: &str) -> WardenResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| {
            WardenError::from(ConfigError::new(format!(
                "Failed to parse configuration: {}",
                e
            )))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the full precedence chain.
    ///
    /// Environment variables use `__` between segments, for example
    /// `WARDEN__RATE_LIMIT__PER_MINUTE=10` or
    /// `WARDEN__IP_WHITELIST__ALLOWED_IPS=10.0.0.1,10.0.0.2`.
    #[instrument]
    pub fn load() -> WardenResult<Self> {
        debug!("Loading configuration with precedence: env > current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/warden/warden.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder
            .add_source(File::with_name("warden").required(false))
            .add_source(
                Environment::with_prefix("WARDEN")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("ip_whitelist.allowed_ips"),
            );

        let config: Self = builder
            .build()
            .map_err(|e| {
                WardenError::from(ConfigError::new(format!(
                    "Failed to build configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                WardenError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        debug!(
            ip_whitelist = config.ip_whitelist.enabled,
            per_minute = config.rate_limit.per_minute,
            per_hour = config.rate_limit.per_hour,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Reject settings the security layer cannot run with.
    pub fn validate(&self) -> WardenResult<()> {
        if self.sanitizer.max_length == 0 {
            return Err(ConfigError::for_key("sanitizer.max_length", "must be greater than zero").into());
        }
        if self.rate_limit.idle_ttl_secs == 0 {
            return Err(ConfigError::for_key("rate_limit.idle_ttl_secs", "must be greater than zero").into());
        }
        crate::IpGate::from_config(&self.ip_whitelist)
            .map_err(|e| WardenError::from(ConfigError::for_key("ip_whitelist.allowed_ips", e.kind().to_string())))?;
        Ok(())
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> WardenResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            WardenError::from(ConfigError::new(format!(
                "Failed to serialize configuration: {}",
                e
            )))
        })
    }
}
