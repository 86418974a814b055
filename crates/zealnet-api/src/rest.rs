// Portal REST client
//
// Thin wrapper over `reqwest::Client` for the mutation endpoints the
// offline queue replays, plus the health endpoint used by the
// connectivity probe. Every endpoint is expected to answer 2xx; anything
// else is surfaced as `Error::Api` with the response body attached.

use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

// Paths are relative to the base URL so a portal mounted under a prefix
// (`https://host/portal/`) keeps it.

/// `POST` target for payment submissions.
pub const PAYMENTS_PATH: &str = "api/payments";
/// `POST` target for plan purchases.
pub const PLAN_PURCHASE_PATH: &str = "api/plans/purchase";
/// `PUT` target for profile updates.
pub const PROFILE_PATH: &str = "api/user/profile";
/// `GET` target probed to decide whether the portal is reachable.
pub const HEALTH_PATH: &str = "api/health";

/// HTTP client for the ZealNet portal API.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: reqwest::Client,
    base_url: Url,
}

impl PortalClient {
    /// Create a client from a `TransportConfig`, optionally sending a
    /// bearer token on every request.
    pub fn new(
        base_url: Url,
        transport: &TransportConfig,
        token: Option<&secrecy::SecretString>,
    ) -> Result<Self, Error> {
        let http = match token {
            Some(token) => transport.build_authorized_client(token)?,
            None => transport.build_client()?,
        };
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
        }
    }

    /// The portal base URL, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── Mutation endpoints ───────────────────────────────────────────

    /// Submit a payment.
    pub async fn submit_payment<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), Error> {
        self.send_json(reqwest::Method::POST, PAYMENTS_PATH, body)
            .await
    }

    /// Purchase a data/time plan.
    pub async fn purchase_plan<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), Error> {
        self.send_json(reqwest::Method::POST, PLAN_PURCHASE_PATH, body)
            .await
    }

    /// Update the customer profile.
    pub async fn update_profile<T: Serialize + ?Sized>(&self, body: &T) -> Result<(), Error> {
        self.send_json(reqwest::Method::PUT, PROFILE_PATH, body)
            .await
    }

    // ── Health ───────────────────────────────────────────────────────

    /// Probe the health endpoint.
    ///
    /// Returns `Ok(status)` for any HTTP answer: the portal is reachable even
    /// if it reports itself degraded. Only transport failures are errors.
    pub async fn probe(&self) -> Result<u16, Error> {
        let url = self.url(HEALTH_PATH)?;
        trace!(url = %url, "probing portal");
        let resp = self.http.get(url).send().await?;
        Ok(resp.status().as_u16())
    }

    // ── Internals ────────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &T,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!(%method, url = %url, "portal request");

        let resp = self.http.request(method, url).json(body).send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let message = resp.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Give the base path a trailing `/` so relative joins append to it.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
