// ── Runtime portal configuration ──
//
// Describes *where* the portal lives and how the clients behave. Never
// touches disk: the CLI builds a `PortalConfig` from its profile and
// hands it to `Portal`.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use zealnet_api::{ReconnectConfig, TlsMode, TransportConfig};

use crate::error::CoreError;
use crate::queue::DEFAULT_MAX_RETRIES;
use crate::socket::default_socket_url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed lab portals).
    DangerAcceptInvalid,
}

impl From<&TlsVerification> for TlsMode {
    fn from(tls: &TlsVerification) -> Self {
        match tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Configuration for one portal deployment.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// REST base URL (e.g. `https://portal.example.net`).
    pub api_url: Url,
    /// Socket endpoint. Derived from `api_url` when unset.
    pub socket_url: Option<Url>,
    /// Directory for the durable store. `None` keeps state in memory.
    pub data_dir: Option<PathBuf>,
    pub tls: TlsVerification,
    /// HTTP request timeout.
    pub timeout: Duration,
    pub reconnect: ReconnectConfig,
    /// Delivery attempts before a queued action is abandoned.
    pub max_retries: u32,
    /// Health probe period. `None` disables the probe.
    pub probe_interval: Option<Duration>,
    /// Initial connectivity assumption until the probe or caller says otherwise.
    pub start_online: bool,
}

impl PortalConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            socket_url: None,
            data_dir: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect: ReconnectConfig::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            probe_interval: None,
            start_online: true,
        }
    }

    /// The configured socket URL, or the one derived from `api_url`.
    pub fn resolved_socket_url(&self) -> Result<Url, CoreError> {
        match &self.socket_url {
            Some(url) => Ok(url.clone()),
            None => default_socket_url(&self.api_url),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: TlsMode::from(&self.tls),
            timeout: self.timeout,
        }
    }
}
