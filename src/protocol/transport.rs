//! The HTTP seam between the ACME client and the network.
//!
//! [`AcmeClient`](super::AcmeClient) speaks in [`http::Request`] and
//! [`http::Response`] values with fully buffered bodies, and hands them to an
//! [`HttpTransport`] for delivery. The default transport is a
//! [`reqwest::Client`]; other transports (recording proxies, test doubles) can
//! be injected at construction time.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use super::Result;

/// The user agent sent with every request.
pub const USER_AGENT: &str = concat!("acme-engine/", env!("CARGO_PKG_VERSION"));

/// The future returned by [`HttpTransport::execute`].
pub type TransportFuture<'t> =
    Pin<Box<dyn Future<Output = Result<http::Response<Vec<u8>>>> + Send + 't>>;

/// Delivers a single HTTP exchange.
///
/// Timeouts and cancellation belong to the transport: the client applies no
/// timers of its own, so a transport timeout applies uniformly to the first
/// attempt of a request and to any retry.
pub trait HttpTransport: fmt::Debug + Send + Sync {
    /// Send `request` and buffer the complete response.
    fn execute(&self, request: http::Request<Vec<u8>>) -> TransportFuture<'_>;
}

/// Builder for the default [`reqwest`]-backed transport.
#[derive(Debug)]
pub struct TransportBuilder {
    inner: reqwest::ClientBuilder,
}

impl Default for TransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportBuilder {
    pub(crate) fn new() -> Self {
        TransportBuilder {
            inner: reqwest::Client::builder().user_agent(USER_AGENT),
        }
    }

    /// Add a custom root certificate to the underlying [`reqwest::Client`].
    ///
    /// This is useful if you are using a self-signed certificate from your ACME
    /// provider for testing, e.g. when using [Pebble](https://github.com/letsencrypt/pebble).
    pub fn add_root_certificate(mut self, cert: reqwest::Certificate) -> Self {
        self.inner = self.inner.add_root_certificate(cert);
        self
    }

    /// Set a timeout on the underlying [`reqwest::Client`].
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    /// Set a connect timeout on the underlying [`reqwest::Client`].
    pub fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.inner = self.inner.connect_timeout(timeout);
        self
    }

    /// Finalize and build the transport. See [`reqwest::ClientBuilder::build`].
    pub fn build(self) -> Result<ReqwestTransport> {
        Ok(ReqwestTransport {
            inner: self.inner.build()?,
        })
    }
}

/// [`HttpTransport`] backed by a [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a builder to configure the transport.
    pub fn builder() -> TransportBuilder {
        TransportBuilder::new()
    }
}

impl From<reqwest::Client> for ReqwestTransport {
    fn from(inner: reqwest::Client) -> Self {
        ReqwestTransport { inner }
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, request: http::Request<Vec<u8>>) -> TransportFuture<'_> {
        Box::pin(async move {
            let request = reqwest::Request::try_from(request)?;
            let response = self.inner.execute(request).await?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            let mut output = http::Response::new(body.to_vec());
            *output.status_mut() = status;
            *output.headers_mut() = headers;
            Ok(output)
        })
    }
}
