//! HTTP access used by discovery.
//!
//! The resolver only ever issues `GET` requests through an [`HttpFetcher`],
//! so callers decide about timeouts, proxies and TLS. [`ReqwestFetcher`] is
//! the default implementation.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

/// Default user agent sent by [`ReqwestFetcher`].
pub const DEFAULT_USER_AGENT: &str = concat!("hosted-discovery/", env!("CARGO_PKG_VERSION"));

/// Default request timeout of [`ReqwestFetcher`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// An error that can arise fetching a URL.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The request could not be completed.
    #[error("request to {url} failed")]
    Transport {
        /// The requested URL.
        url: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The HTTP client could not be set up.
    #[error("cannot build HTTP client")]
    Client(#[source] reqwest::Error),
}

/// A fetched HTTP response.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct HttpResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response with no headers.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Adds a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns `true` for the statuses discovery accepts: 200 and 206.
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 206)
    }

    /// First value of header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Response body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the response, returning its body.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Performs HTTP `GET` requests on behalf of the resolver.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetches `url`. Any HTTP status is a successful fetch; only transport
    /// failures are errors.
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// [`HttpFetcher`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with [`DEFAULT_USER_AGENT`] and [`DEFAULT_TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_settings(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT)
    }

    /// Creates a fetcher with a custom user agent and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the TLS backend cannot be initialized.
    pub fn with_settings(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_owned(),
            source: Box::new(e),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                let value = value.to_str().ok()?;
                Some((name.as_str().to_owned(), value.to_owned()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
