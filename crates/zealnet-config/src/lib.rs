//! Shared configuration for ZealNet tools.
//!
//! TOML profiles, one per portal deployment, merged from defaults, the
//! config file and `ZEALNET_*` environment variables, and translated to
//! `zealnet_core::PortalConfig`. The CLI layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use zealnet_core::{Backoff, DEFAULT_MAX_RETRIES, PortalConfig, ReconnectConfig, TlsVerification};

/// Prefix of configuration environment variables. `__` separates nesting,
/// e.g. `ZEALNET_PROFILES__DEFAULT__API_URL`.
pub const ENV_PREFIX: &str = "ZEALNET_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' is not defined")]
    MissingProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named explicitly.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named portal profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: `explicit`, else `default_profile`,
    /// else `"default"`.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::MissingProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// Delay growth between socket reconnection attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// A named portal deployment.
///
/// Durations are humantime strings (`"3s"`, `"1m 30s"`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Portal REST base URL (e.g. "https://portal.example.net").
    pub api_url: String,

    /// Socket endpoint. Derived from `api_url` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_url: Option<String>,

    /// Where the offline queue and auth token are stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Path to a custom CA certificate (PEM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Overrides `defaults.insecure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Overrides `defaults.timeout` (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_delay: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_backoff: Option<BackoffKind>,

    /// Cap for exponential backoff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_max_delay: Option<String>,

    /// Delivery attempts before a queued action is abandoned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Enables the health probe at this period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_interval: Option<String>,
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("net", "zealnet", "zealnet")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default store directory for a profile.
pub fn default_data_dir(profile_name: &str) -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("data").join(profile_name),
        |dirs| dirs.data_dir().join(profile_name),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("zealnet");
    p
}

// ── Loading & saving ────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it cannot be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

/// Serialize config to TOML and write it to the canonical path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("'{raw}' is not a hierarchical URL"),
        });
    }
    Ok(url)
}

fn parse_duration(field: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid duration '{raw}': {e}"),
    })
}

/// Build a `PortalConfig` from a profile, with `defaults` filling gaps.
pub fn profile_to_portal_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<PortalConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    if !matches!(api_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected http or https, got '{}'", api_url.scheme()),
        });
    }

    let mut config = PortalConfig::new(api_url);

    config.socket_url = profile
        .socket_url
        .as_deref()
        .map(|raw| parse_url("socket_url", raw))
        .transpose()?;

    config.data_dir = Some(
        profile
            .data_dir
            .clone()
            .unwrap_or_else(|| default_data_dir(profile_name)),
    );

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));

    let mut reconnect = ReconnectConfig::default();
    if let Some(ref raw) = profile.reconnect_delay {
        reconnect.delay = parse_duration("reconnect_delay", raw)?;
    }
    if let Some(attempts) = profile.reconnect_attempts {
        reconnect.max_attempts = attempts;
    }
    if profile.reconnect_backoff.unwrap_or_default() == BackoffKind::Exponential {
        let max_delay = match profile.reconnect_max_delay {
            Some(ref raw) => parse_duration("reconnect_max_delay", raw)?,
            None => Duration::from_secs(30),
        };
        reconnect.backoff = Backoff::Exponential { max_delay };
    }
    config.reconnect = reconnect;

    config.max_retries = profile.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);
    if config.max_retries == 0 {
        return Err(ConfigError::Validation {
            field: "max_retries".into(),
            reason: "must be at least 1".into(),
        });
    }

    config.probe_interval = profile
        .probe_interval
        .as_deref()
        .map(|raw| parse_duration("probe_interval", raw))
        .transpose()?;

    Ok(config)
}
