// Caddy admin API HTTP client
//
// Wraps `reqwest::Client` with admin-endpoint URL construction and
// error-body decoding. Routes are addressed by their `@id`, so callers
// never depend on a route's position inside the server's route list.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{AdminError, Route};
use crate::transport::TransportConfig;

/// Raw HTTP client for a Caddy admin endpoint.
///
/// One client publishes routes into a single HTTP server block
/// (`apps.http.servers.{server}`).
pub struct CaddyClient {
    http: reqwest::Client,
    base_url: Url,
    server: String,
    timeout: Option<Duration>,
}

impl CaddyClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the admin listener root, e.g. `http://localhost:2019`.
    pub fn new(base_url: Url, server: String, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            server,
            timeout: Some(transport.timeout),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Timeouts surface as [`Error::Transport`], since the client's limit
    /// is unknown here.
    pub fn with_client(http: reqwest::Client, base_url: Url, server: String) -> Self {
        Self {
            http,
            base_url,
            server,
            timeout: None,
        }
    }

    /// The admin endpoint base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The HTTP server block routes are published into.
    pub fn server(&self) -> &str {
        &self.server
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/id/{id}`: direct access to an object carrying `@id`.
    pub(crate) fn id_url(&self, id: &str) -> Result<Url, Error> {
        let full = format!("{}/id/{}", self.base_url.as_str().trim_end_matches('/'), id);
        Ok(Url::parse(&full)?)
    }

    /// `{base}/config/apps/http/servers/{server}/routes`
    pub(crate) fn routes_url(&self) -> Result<Url, Error> {
        let full = format!(
            "{}/config/apps/http/servers/{}/routes",
            self.base_url.as_str().trim_end_matches('/'),
            self.server
        );
        Ok(Url::parse(&full)?)
    }

    // ── Route operations ─────────────────────────────────────────────

    /// Fetch a route by `@id`. Returns `None` if Caddy has no such object.
    pub async fn get_route(&self, id: &str) -> Result<Option<Route>, Error> {
        let url = self.id_url(id)?;
        match self.get(url).await {
            Ok(route) => Ok(Some(route)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `@id`s of every route in the server block. Routes without an id are
    /// skipped, and an absent server block has none.
    ///
    /// `GET /config/apps/http/servers/{server}/routes`
    pub async fn list_route_ids(&self) -> Result<Vec<String>, Error> {
        let url = self.routes_url()?;
        let routes: Option<Vec<serde_json::Value>> = match self.get(url).await {
            Ok(routes) => routes,
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        Ok(routes
            .unwrap_or_default()
            .iter()
            .filter_map(|route| route.get("@id").and_then(serde_json::Value::as_str))
            .map(str::to_owned)
            .collect())
    }

    /// Replace the route carrying `route.id`, appending it to the server's
    /// route list when Caddy does not know that id yet.
    ///
    /// `PATCH /id/{id}`, falling back to `POST /config/apps/http/servers/{server}/routes`.
    pub async fn upsert_route(&self, route: &Route) -> Result<(), Error> {
        let Some(id) = route.id.as_deref() else {
            return Err(Error::Rejected {
                status: 400,
                message: "route has no @id".into(),
            });
        };

        match self.send_json(reqwest::Method::PATCH, self.id_url(id)?, route).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => {
                debug!(route_id = id, "route unknown to proxy, appending");
                self.send_json(reqwest::Method::POST, self.routes_url()?, route)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Delete the route carrying `id`. Returns `false` if it was already gone.
    ///
    /// `DELETE /id/{id}`
    pub async fn delete_route(&self, id: &str) -> Result<bool, Error> {
        let url = self.id_url(id)?;
        debug!("DELETE {}", url);

        let resp = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        match self.check_status(resp).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let body = self.check_status(resp).await?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    async fn send_json(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &impl Serialize,
    ) -> Result<(), Error> {
        debug!("{} {}", method, url);

        let resp = self
            .http
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.check_status(resp).await.map(|_| ())
    }

    /// Return the body on 2xx, or an `Error::Rejected` carrying Caddy's
    /// `{"error": "..."}` message otherwise.
    async fn check_status(&self, resp: reqwest::Response) -> Result<String, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if status.is_success() {
            return Ok(body);
        }

        let message = serde_json::from_str::<AdminError>(&body)
            .map(|e| e.error)
            .unwrap_or_else(|_| {
                if body.is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });

        Err(Error::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    /// Name the configured limit when a request ran out of time.
    fn transport_error(&self, err: reqwest::Error) -> Error {
        match self.timeout {
            Some(timeout) if err.is_timeout() => Error::Timeout {
                timeout_secs: timeout.as_secs(),
            },
            _ => Error::Transport(err),
        }
    }
}
