// RESTful HTTP client
//
// Wraps `reqwest::Client` with per-device URL construction, bearer-token
// injection, and status-code classification. Every device is addressed
// by IP, so one client instance serves the whole fleet.

use std::net::IpAddr;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::protocol::Protocol;
use crate::restful::route::Route;
use crate::southbound::{ActionCall, SouthboundClient, Target};
use crate::transport::TransportConfig;

/// Connection settings shared by every device the client talks to.
#[derive(Debug, Clone)]
pub struct RestfulConfig {
    /// `https` on production switches, `http` for lab setups.
    pub scheme: String,
    /// Explicit port, or `None` for the scheme default.
    pub port: Option<u16>,
    pub transport: TransportConfig,
}

impl Default for RestfulConfig {
    fn default() -> Self {
        Self {
            scheme: "https".into(),
            port: None,
            transport: TransportConfig::default(),
        }
    }
}

/// Token-authenticated JSON client for switch management APIs.
pub struct RestfulClient {
    http: reqwest::Client,
    config: RestfulConfig,
}

impl RestfulClient {
    /// Create a new client from a `RestfulConfig`.
    pub fn new(config: RestfulConfig) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        Ok(Self { http, config })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, config: RestfulConfig) -> Self {
        Self { http, config }
    }

    /// The underlying HTTP client (for the login flow).
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Root URL of one device: `{scheme}://{address}[:{port}]/`.
    pub fn device_url(&self, address: IpAddr) -> Result<Url, Error> {
        let mut url = Url::parse(&format!("{}://device.invalid/", self.config.scheme))?;
        url.set_ip_host(address)
            .map_err(|()| Error::Protocol(format!("cannot address {address} over HTTP")))?;
        url.set_port(self.config.port)
            .map_err(|()| Error::Protocol(format!("scheme '{}' takes no port", self.config.scheme)))?;
        Ok(url)
    }

    /// Full URL of `path` on one device.
    pub(crate) fn endpoint(&self, address: IpAddr, path: &str) -> Result<Url, Error> {
        Ok(self.device_url(address)?.join(path)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send one routed request and decode the JSON body.
    async fn send(
        &self,
        address: IpAddr,
        route: &Route,
        token: Option<&str>,
        payload: Option<&Value>,
    ) -> Result<Value, Error> {
        let url = self.endpoint(address, &route.path)?;
        debug!(method = ?route.method, %url, "sending RESTful action");

        let mut builder = self.http.request(route.method.into(), url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = payload {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(Error::Transport)?;
        parse_response(resp).await
    }
}

#[async_trait]
impl SouthboundClient for RestfulClient {
    fn protocol(&self) -> Protocol {
        Protocol::Restful
    }

    async fn login(&self, target: Target<'_>) -> Result<String, Error> {
        self.login_device(target).await
    }

    async fn execute(&self, call: ActionCall<'_>) -> Result<Value, Error> {
        let route = Route::from_params(call.action, call.params)?;
        self.send(call.target.address, &route, call.token, call.payload)
            .await
    }
}

/// Map the HTTP status onto the error taxonomy and decode the body.
///
/// An empty success body decodes to `Value::Null`.
pub(crate) async fn parse_response(resp: reqwest::Response) -> Result<Value, Error> {
    let status = resp.status();
    let resource = resp.url().path().to_owned();

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        let message: String = body.chars().take(200).collect();
        return Err(match status {
            reqwest::StatusCode::UNAUTHORIZED => Error::Unauthorized { message },
            reqwest::StatusCode::SERVICE_UNAVAILABLE => Error::ServiceUnavailable { message },
            reqwest::StatusCode::NOT_FOUND => Error::NotFound { resource },
            reqwest::StatusCode::BAD_REQUEST => Error::BadRequest { message },
            other => Error::Http {
                status: other.as_u16(),
                body: message,
            },
        });
    }

    let body = resp.text().await.map_err(Error::Transport)?;
    if body.trim().is_empty() {
        trace!(%resource, "empty response body");
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}
