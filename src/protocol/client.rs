//! Client for sending HTTP requests to an ACME server

use std::sync::Arc;

use http::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use tokio::sync::OnceCell;

use super::errors::AcmeErrorDocument;
use super::links::{Links, REL_TERMS_OF_SERVICE};
use super::jose::Nonce;
use super::nonce::{extract_nonce, NonceCache};
use super::request::CONTENT_JOSE;
use super::response::{Decode, Response};
use super::transport::{HttpTransport, USER_AGENT as AGENT};
use super::{AcmeError, Request, Result, Url};
use crate::schema::directory::Directory;

pub use AcmeClient as Client;

/// How many times a missing nonce is re-requested from `new-nonce` before
/// giving up with [`AcmeError::MissingNonce`].
pub const MAX_NONCE_REFRESH: usize = 3;

/// Resends allowed after a `badNonce` error, unless configured otherwise.
pub const DEFAULT_BAD_NONCE_RETRIES: usize = 1;

/// ACME HTTP Client
///
/// The client handles sending ACME HTTP requests, and providing ACME HTTP
/// responses using the [`super::Request`] and [`super::Response`] objects
/// respectively. It owns the two pieces of per-session state shared by every
/// request: the [`NonceCache`] and the provider [`Directory`], which is
/// fetched on first use and never again.
///
/// All methods take `&self`; the client can be shared between concurrent
/// tasks, which will only contend for the nonce slot.
#[derive(Debug)]
pub struct AcmeClient {
    transport: Arc<dyn HttpTransport>,
    nonces: NonceCache,
    directory_url: Url,
    directory: OnceCell<Directory>,
    bad_nonce_retries: usize,
}

impl AcmeClient {
    /// Create a client for the provider whose directory lives at `directory_url`.
    pub fn new(transport: Arc<dyn HttpTransport>, directory_url: Url) -> Self {
        AcmeClient {
            transport,
            nonces: NonceCache::new(),
            directory_url,
            directory: OnceCell::new(),
            bad_nonce_retries: DEFAULT_BAD_NONCE_RETRIES,
        }
    }

    /// Set how many times a request is resent after a `badNonce` error.
    pub fn with_bad_nonce_retries(mut self, retries: usize) -> Self {
        self.bad_nonce_retries = retries;
        self
    }

    /// The directory URL this client was configured with.
    pub fn directory_url(&self) -> &Url {
        &self.directory_url
    }

    /// The nonce cache used by this client.
    pub fn nonces(&self) -> &NonceCache {
        &self.nonces
    }

    /// The provider directory, fetched on first use.
    pub async fn directory(&self) -> Result<&Directory> {
        self.directory
            .get_or_try_init(|| async {
                tracing::debug!(url = %self.directory_url.as_str(), "Fetching directory");
                let response: Response<Directory> = self.get(&self.directory_url).await?;
                Ok::<_, AcmeError>(response.into_inner())
            })
            .await
    }

    /// Run a plain HTTP `GET` request without using the ACME HTTP JWS
    /// protocol.
    pub async fn get<R>(&self, url: &Url) -> Result<Response<R>>
    where
        R: Decode,
    {
        let request = http::Request::get(url.as_str())
            .header(USER_AGENT, AGENT)
            .body(Vec::new())?;
        let response = self.transport.execute(request).await?;
        self.record_nonce(response.headers());
        if !response.status().is_success() {
            return Err(process_error_response(url, response));
        }
        Response::from_http(url.clone(), response)
    }

    /// Execute a signed request using the ACME protocol.
    ///
    /// A fresh nonce is consumed for every attempt. When the provider rejects
    /// the nonce, the request is re-signed and resent, up to the configured
    /// retry budget; every other error is returned as-is.
    pub async fn execute<P, R>(&self, request: &Request<P>) -> Result<Response<R>>
    where
        P: Serialize,
        R: Decode,
    {
        let mut retries = self.bad_nonce_retries;
        loop {
            let nonce = self.consume_nonce().await?;
            let body = request.body(nonce)?;

            #[cfg(feature = "trace-requests")]
            tracing::trace!("REQ: POST {}\n{}", request.url().as_str(), String::from_utf8_lossy(&body));

            let http_request = http::Request::post(request.url().as_str())
                .header(CONTENT_TYPE, CONTENT_JOSE)
                .header(USER_AGENT, AGENT)
                .body(body)?;
            let response = self.transport.execute(http_request).await?;
            self.record_nonce(response.headers());

            #[cfg(feature = "trace-requests")]
            tracing::trace!(
                "RES: {}\n{}",
                response.status(),
                String::from_utf8_lossy(response.body())
            );

            if response.status().is_success() {
                return Response::from_http(request.url().clone(), response);
            }

            match process_error_response(request.url(), response) {
                error if error.is_bad_nonce() && retries > 0 => {
                    retries -= 1;
                    tracing::debug!(url = %request.url().as_str(), "Retrying request with next nonce");
                }
                error => return Err(error),
            }
        }
    }

    /// Take the cached nonce, asking the provider for a new one if none is cached.
    pub(crate) async fn consume_nonce(&self) -> Result<Nonce> {
        if let Some(nonce) = self.nonces.take() {
            return Ok(nonce);
        }

        for attempt in 1..=MAX_NONCE_REFRESH {
            tracing::debug!(attempt, "Requesting a new nonce");
            if let Some(nonce) = self.refresh_nonce().await? {
                return Ok(nonce);
            }
        }

        Err(AcmeError::MissingNonce)
    }

    /// The nonce from a `HEAD` to `newNonce`. It goes straight to the caller,
    /// never through the shared slot.
    async fn refresh_nonce(&self) -> Result<Option<Nonce>> {
        let url = self
            .directory()
            .await?
            .new_nonce
            .clone()
            .ok_or(AcmeError::Unsupported("new-nonce"))?;

        let request = http::Request::head(url.as_str())
            .header(USER_AGENT, AGENT)
            .body(Vec::new())?;
        let response = self.transport.execute(request).await?;
        if !response.status().is_success() {
            return Err(process_error_response(&url, response));
        }
        match extract_nonce(response.headers()) {
            Ok(nonce) => Ok(Some(nonce)),
            Err(AcmeError::MissingNonce) => Ok(None),
            Err(error) => {
                tracing::warn!("Ignoring nonce header: {error}");
                Ok(None)
            }
        }
    }

    fn record_nonce(&self, headers: &http::HeaderMap) {
        match extract_nonce(headers) {
            Ok(nonce) => {
                tracing::trace!(nonce = nonce.as_ref(), "Recorded nonce");
                self.nonces.store(nonce);
            }
            Err(AcmeError::MissingNonce) => {}
            Err(error) => tracing::warn!("Ignoring nonce header: {error}"),
        }
    }
}

fn process_error_response(url: &Url, response: http::Response<Vec<u8>>) -> AcmeError {
    debug_assert!(
        !response.status().is_success(),
        "expected to process an error result"
    );
    let status = response.status();
    let body = response.body();

    if body.iter().all(u8::is_ascii_whitespace) {
        return AcmeError::HttpStatus(status);
    }

    match serde_json::from_slice::<AcmeErrorDocument>(body) {
        Ok(document) => {
            tracing::trace!(%document, %status, "Provider returned an error document");
            let terms_of_service = Links::from_headers(response.headers(), url)
                .first(REL_TERMS_OF_SERVICE)
                .cloned();
            AcmeError::Acme(
                document
                    .with_status(status.as_u16())
                    .with_terms_of_service(terms_of_service),
            )
        }
        Err(error) => {
            tracing::warn!(%status, "Failed to parse error document {}: {}", error, String::from_utf8_lossy(body));
            AcmeError::HttpStatus(status)
        }
    }
}
