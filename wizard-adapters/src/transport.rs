//! JSON-over-HTTP transport seam used by the provider codecs.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use hyper::body::HttpBody;
use hyper::client::HttpConnector;
use hyper::header::{CONTENT_TYPE, RETRY_AFTER};
use hyper::{Body, Client, Request, Response, Uri};
use hyper_rustls::HttpsConnector;
use rustls::{ClientConfig, OwnedTrustAnchor, RootCertStore};
use tokio::time::timeout;
use tracing::debug;

use crate::error::{AdapterError, AdapterResult};

/// Outgoing JSON POST.
#[derive(Clone)]
pub struct TransportRequest {
    url: String,
    headers: Vec<(String, String)>,
    body: serde_json::Value,
}

impl TransportRequest {
    /// Creates a POST request carrying the supplied JSON body.
    #[must_use]
    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
        }
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Target URL, including any query string.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Extra headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the value of the first header with the given name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// JSON payload.
    #[must_use]
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }
}

// Header values and the URL may carry credentials.
impl fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        let path = self.url.split('?').next().unwrap_or_default();
        f.debug_struct("TransportRequest")
            .field("url", &path)
            .field("headers", &names)
            .finish_non_exhaustive()
    }
}

/// Checks that `input` is an absolute HTTP(S) URI and returns it trimmed.
pub(crate) fn validate_endpoint(input: &str) -> AdapterResult<String> {
    let endpoint = input.trim();
    let uri = endpoint
        .parse::<Uri>()
        .map_err(|err| AdapterError::configuration(format!("invalid endpoint `{endpoint}`: {err}")))?;
    match uri.scheme_str() {
        Some("http" | "https") if uri.host().is_some() => Ok(endpoint.to_owned()),
        _ => Err(AdapterError::configuration(format!(
            "endpoint `{endpoint}` must be an absolute http(s) URL"
        ))),
    }
}

/// Raw provider answer.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    status: u16,
    retry_after: Option<Duration>,
    body: Bytes,
}

impl TransportResponse {
    /// Creates a response from its parts.
    #[must_use]
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    /// Attaches the `Retry-After` hint.
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Response body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Converts a non-success response into the matching [`AdapterError`].
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::RateLimited`] for 429 and
    /// [`AdapterError::Status`] for any other non-2xx status.
    pub fn error_for_status(self) -> AdapterResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        if self.status == 429 {
            return Err(AdapterError::RateLimited {
                retry_after: self.retry_after,
            });
        }
        Err(AdapterError::Status {
            status: self.status,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }
}

/// Capability to send a JSON request and receive the raw answer.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends the request; non-2xx statuses are returned, not raised.
    async fn send(&self, request: TransportRequest) -> AdapterResult<TransportResponse>;
}

/// HTTPS transport backed by `hyper` and `rustls`.
pub struct HyperTransport {
    client: HyperClient,
    timeout: Duration,
}

impl fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HyperTransport")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Builds a transport with the supplied per-request timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .build::<_, Body>(https_connector());
        Self { client, timeout }
    }
}

type HyperClient = Client<HttpsConnector<HttpConnector>, Body>;

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest response body accepted from a provider.
pub const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// Bundled web PKI roots only.
fn https_connector() -> HttpsConnector<HttpConnector> {
    let mut roots = RootCertStore::empty();
    roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|root| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            root.subject,
            root.spki,
            root.name_constraints,
        )
    }));
    let tls = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let mut tcp = HttpConnector::new();
    tcp.enforce_http(false);
    HttpsConnector::from((tcp, Arc::new(tls)))
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(&self, request: TransportRequest) -> AdapterResult<TransportResponse> {
        let uri = request
            .url()
            .parse::<Uri>()
            .map_err(|err| AdapterError::configuration(format!("invalid endpoint: {err}")))?;
        let body = serde_json::to_vec(request.body()).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode request body: {err}"))
        })?;

        let mut builder = Request::post(uri).header(CONTENT_TYPE, "application/json");
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let http_request = builder
            .body(Body::from(body))
            .map_err(|err| AdapterError::transport(format!("failed to build request: {err}")))?;

        debug!(?request, "sending provider request");
        let exchange = async {
            let response = self
                .client
                .request(http_request)
                .await
                .map_err(|err| AdapterError::transport(format!("request failed: {err}")))?;
            read_response(response, MAX_RESPONSE_BYTES).await
        };
        within(self.timeout, exchange).await
    }
}

// The deadline covers connect, headers and the whole body.
async fn within<T>(
    limit: Duration,
    work: impl Future<Output = AdapterResult<T>>,
) -> AdapterResult<T> {
    timeout(limit, work)
        .await
        .map_err(|_| AdapterError::transport(format!("no complete response within {limit:?}")))?
}

async fn read_response(response: Response<Body>, limit: usize) -> AdapterResult<TransportResponse> {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let mut body = response.into_body();
    let mut collected = BytesMut::new();
    while let Some(chunk) = body.data().await {
        let chunk =
            chunk.map_err(|err| AdapterError::transport(format!("failed to read response: {err}")))?;
        if collected.len() + chunk.len() > limit {
            return Err(AdapterError::response(format!(
                "response body exceeds {limit} bytes"
            )));
        }
        collected.extend_from_slice(&chunk);
    }

    let mut answer = TransportResponse::new(status, collected.freeze());
    if let Some(delay) = retry_after {
        answer = answer.with_retry_after(delay);
    }
    Ok(answer)
}
