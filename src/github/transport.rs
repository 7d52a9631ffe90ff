//! HTTP transport seam for the repository client
//!
//! The client only needs `GET url -> response`, so the transport is a trait:
//! tests substitute scripted fakes and callers can layer a disk-backed
//! response cache underneath without the client knowing about it.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

use crate::error::BoxError;

/// Raw response handed back by a [`Transport`]
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Response with the given status, no headers and an empty body
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// Replace the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header, ignoring names or values that are not valid HTTP
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Anything able to perform an HTTP GET
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET request; `Err` means no HTTP response was obtained
    async fn get(&self, url: &str) -> Result<TransportResponse, BoxError>;
}

/// Recognizes responses served from a local cache instead of the network
pub type CachePredicate = Arc<dyn Fn(&TransportResponse) -> bool + Send + Sync>;

/// Predicate matching responses whose `name` header equals `value`
///
/// Caching transports usually mark replayed responses with a header such as
/// `X-From-Cache: 1`.
///
/// ```
/// use pkg_sweep::github::{TransportResponse, cache_header_predicate};
/// use reqwest::StatusCode;
///
/// let is_cached = cache_header_predicate("X-From-Cache", "1");
/// let response = TransportResponse::new(StatusCode::OK).with_header("X-From-Cache", "1");
/// assert!(is_cached(&response));
/// ```
pub fn cache_header_predicate(name: &str, value: &str) -> CachePredicate {
    let name = name.to_ascii_lowercase();
    let value = value.to_string();
    Arc::new(move |response: &TransportResponse| response.header(&name) == Some(value.as_str()))
}

/// Default transport backed by a `reqwest` client
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client (e.g. one with a caching middleware or proxy)
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, BoxError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
