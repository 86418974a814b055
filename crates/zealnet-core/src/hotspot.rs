// ── MikroTik hotspot redirect helper ──
//
// A MikroTik access controller redirects unauthenticated clients to the
// portal with its own parameters in the query string. These helpers parse
// them and build the login submission back to the controller.
//
// Everything here is pure except `redirect_to_login`, which hands the
// finished URL to a `Navigator`.

use std::future::Future;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::query::set_query_params;

/// Session password used when the controller supplied no MAC address.
pub const PLACEHOLDER_PASSWORD: &str = "anypassword";

/// Identifier used when the controller supplied nothing identifying.
pub const GUEST_IDENTIFIER: &str = "guest";

#[derive(Debug, Error)]
pub enum HotspotError {
    #[error("Invalid hotspot login URL '{url}': {reason}")]
    InvalidLoginUrl { url: String, reason: String },

    #[error("No hotspot login URL (link-login) in the redirect parameters")]
    MissingLoginUrl,

    #[error("Hotspot login request to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
}

// ── HotspotParams ────────────────────────────────────────────────

/// Parameters injected by the access controller into the redirect URL.
///
/// Empty values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HotspotParams {
    pub mac: Option<String>,
    pub ip: Option<String>,
    pub username: Option<String>,
    pub link_login: Option<String>,
    pub link_orig: Option<String>,
    pub error: Option<String>,
    pub chap_id: Option<String>,
    pub chap_challenge: Option<String>,
}

impl HotspotParams {
    /// Parse a raw query string, with or without the leading `?`.
    ///
    /// Both `link-login` and `link_login` spellings are accepted (likewise
    /// for `link-orig`, `chap-id` and `chap-challenge`); the hyphenated one
    /// wins when both are present.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();
        let mut underscored = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "mac" => &mut params.mac,
                "ip" => &mut params.ip,
                "username" => &mut params.username,
                "error" => &mut params.error,
                "link-login" => &mut params.link_login,
                "link-orig" => &mut params.link_orig,
                "chap-id" => &mut params.chap_id,
                "chap-challenge" => &mut params.chap_challenge,
                "link_login" => &mut underscored.link_login,
                "link_orig" => &mut underscored.link_orig,
                "chap_id" => &mut underscored.chap_id,
                "chap_challenge" => &mut underscored.chap_challenge,
                _ => continue,
            };
            // First occurrence of a name wins.
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }

        params.link_login = params.link_login.or(underscored.link_login);
        params.link_orig = params.link_orig.or(underscored.link_orig);
        params.chap_id = params.chap_id.or(underscored.chap_id);
        params.chap_challenge = params.chap_challenge.or(underscored.chap_challenge);
        params
    }

    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }
}

/// Whether these parameters came from a controller redirect.
pub fn is_hotspot_redirect(params: &HotspotParams) -> bool {
    params.link_login.is_some() || params.mac.is_some()
}

pub fn is_hotspot_url(url: &Url) -> bool {
    is_hotspot_redirect(&HotspotParams::from_url(url))
}

// ── Login URL ────────────────────────────────────────────────────

/// Build the controller login submission URL.
///
/// Sets `username`, `password` and (when known) `dst`, replacing any
/// existing parameters with those names.
pub fn build_login_url(
    link_login: &str,
    username: &str,
    password: &str,
    dst: Option<&str>,
) -> Result<Url, HotspotError> {
    let invalid = |reason: String| HotspotError::InvalidLoginUrl {
        url: link_login.to_owned(),
        reason,
    };

    let mut url = Url::parse(link_login.trim()).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("not a hierarchical URL".into()));
    }

    let mut params = vec![("username", username), ("password", password)];
    if let Some(dst) = dst.filter(|d| !d.is_empty()) {
        params.push(("dst", dst));
    }
    set_query_params(&mut url, &params);
    Ok(url)
}

/// Performs the full-page navigation to the controller.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url)
    -> impl Future<Output = Result<NavigationOutcome, HotspotError>> + Send;
}

/// Where a navigation ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationOutcome {
    pub url: Url,
    /// HTTP status of the final response, when the navigator performs the request.
    pub status: Option<u16>,
}

/// Submit the login to the controller named in `params`.
///
/// The original destination (`link_orig`) is passed as `dst`. Nothing is
/// navigated when the login URL is missing or malformed.
pub async fn redirect_to_login<N: Navigator>(
    navigator: &N,
    params: &HotspotParams,
    username: &str,
    password: &str,
) -> Result<NavigationOutcome, HotspotError> {
    let link_login = params
        .link_login
        .as_deref()
        .ok_or(HotspotError::MissingLoginUrl)?;
    let url = build_login_url(link_login, username, password, params.link_orig.as_deref())?;

    info!(controller = %redacted(&url), username, "redirecting to hotspot login");
    navigator.navigate(&url).await
}

/// Login URL with the password masked, for logs.
fn redacted(url: &Url) -> String {
    let mut masked = url.clone();
    if url.query_pairs().any(|(k, _)| k == "password") {
        set_query_params(&mut masked, &[("password", "***")]);
    }
    masked.to_string()
}

// ── HttpNavigator ────────────────────────────────────────────────

/// Submits the login with an HTTP GET, following redirects.
#[derive(Debug, Clone)]
pub struct HttpNavigator {
    http: reqwest::Client,
}

impl HttpNavigator {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl Navigator for HttpNavigator {
    async fn navigate(&self, url: &Url) -> Result<NavigationOutcome, HotspotError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| HotspotError::Navigation {
                url: redacted(url),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        debug!(status, final_url = %response.url(), "hotspot login answered");
        Ok(NavigationOutcome {
            url: response.url().clone(),
            status: Some(status),
        })
    }
}

// ── Display helpers ──────────────────────────────────────────────

/// Deterministic per-session password derived from the MAC address.
///
/// Colons are stripped and the result lowercased. This is not a secret:
/// the controller is expected to trust the LAN segment instead.
pub fn generate_session_password(mac: Option<&str>) -> String {
    match mac.filter(|m| !m.is_empty()) {
        Some(mac) => mac.replace(':', "").to_lowercase(),
        None => PLACEHOLDER_PASSWORD.to_owned(),
    }
}

pub fn format_mac(mac: &str) -> String {
    mac.to_uppercase()
}

/// Username, else MAC, else IP, else `"guest"`.
pub fn user_identifier(params: &HotspotParams) -> &str {
    params
        .username
        .as_deref()
        .or(params.mac.as_deref())
        .or(params.ip.as_deref())
        .unwrap_or(GUEST_IDENTIFIER)
}
