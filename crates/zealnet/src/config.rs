//! Resolution of the active profile plus command-line overrides.
//!
//! Core never sees the TOML types: commands receive a finished
//! `PortalConfig` or a data directory.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;

use zealnet_config::{Config, config_path, default_data_dir, profile_to_portal_config};
use zealnet_core::{PortalConfig, TlsMode, TlsVerification, TransportConfig};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Load the config file, failing loudly on a malformed one.
pub fn load(global: &GlobalOpts) -> Result<(Config, String), CliError> {
    let cfg = zealnet_config::load_config()?;
    let name = cfg.active_profile_name(global.profile.as_deref());
    Ok((cfg, name))
}

/// Build the portal configuration for the active profile.
///
/// Without a matching profile, `--api-url` alone is enough; the store then
/// lives in the profile's default data directory.
pub fn resolve_portal(global: &GlobalOpts) -> Result<PortalConfig, CliError> {
    let (cfg, name) = load(global)?;

    let mut portal = if let Some(profile) = cfg.profiles.get(&name) {
        let mut profile = profile.clone();
        if let Some(ref url) = global.api_url {
            profile.api_url.clone_from(url);
        }
        profile_to_portal_config(&profile, &name, &cfg.defaults)?
    } else {
        let raw = global.api_url.as_deref().ok_or_else(|| CliError::NoConfig {
            path: config_path().display().to_string(),
        })?;
        let profile = zealnet_config::Profile {
            api_url: raw.to_owned(),
            ..zealnet_config::Profile::default()
        };
        profile_to_portal_config(&profile, &name, &cfg.defaults)?
    };

    if let Some(ref dir) = global.data_dir {
        portal.data_dir = Some(dir.clone());
    }
    if global.insecure {
        portal.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        portal.timeout = Duration::from_secs(secs);
    }

    tracing::debug!(profile = %name, api_url = %portal.api_url, "resolved portal config");
    Ok(portal)
}

/// Directory of the durable store, for commands that only touch local state.
pub fn resolve_data_dir(global: &GlobalOpts) -> Result<PathBuf, CliError> {
    if let Some(ref dir) = global.data_dir {
        return Ok(dir.clone());
    }
    let (cfg, name) = load(global)?;
    Ok(cfg
        .profiles
        .get(&name)
        .and_then(|p| p.data_dir.clone())
        .unwrap_or_else(|| default_data_dir(&name)))
}

/// TLS and timeout settings for requests outside the portal API.
///
/// Follows the active profile when there is one; otherwise the config
/// file's `[defaults]` plus the command-line overrides.
pub fn resolve_transport(global: &GlobalOpts) -> Result<TransportConfig, CliError> {
    match resolve_portal(global) {
        Ok(portal) => Ok(portal.transport()),
        Err(CliError::NoConfig { .. }) => {
            let defaults = zealnet_config::load_config()?.defaults;
            let insecure = global.insecure || defaults.insecure;
            Ok(TransportConfig {
                tls: if insecure {
                    TlsMode::DangerAcceptInvalid
                } else {
                    TlsMode::System
                },
                timeout: Duration::from_secs(global.timeout.unwrap_or(defaults.timeout)),
            })
        }
        Err(e) => Err(e),
    }
}

/// The config file's `defaults.output`, when it names a known format.
pub fn configured_output() -> Option<OutputFormat> {
    let raw = zealnet_config::load_config_or_default().defaults.output;
    match OutputFormat::from_str(&raw, true) {
        Ok(format) => Some(format),
        Err(_) => {
            tracing::warn!(output = %raw, "unknown defaults.output in config, using table");
            None
        }
    }
}

/// HTTP timeout for requests that do not go through a profile.
pub fn request_timeout(global: &GlobalOpts) -> Duration {
    let secs = global
        .timeout
        .unwrap_or_else(|| zealnet_config::load_config_or_default().defaults.timeout);
    Duration::from_secs(secs)
}
