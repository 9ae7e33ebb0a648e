//! Decoded provider responses.
//!
//! Every response should carry a fresh [nonce][super::jose::Nonce]. Bodies are
//! JSON, apart from certificate downloads which are PEM text ([RFC 8555][]
//! section 7.4.2).
//!
//! [RFC 8555]: https://datatracker.ietf.org/doc/html/rfc8555

use chrono::{DateTime, Utc};
use http::HeaderMap;
use serde::de::DeserializeOwned;

use super::jose::Nonce;
use super::links::Links;
use super::AcmeError;
use super::Url;

/// Body decoding for [`Response`].
///
/// Anything `Deserialize` decodes as JSON. Implement this directly only for
/// non-JSON bodies.
pub trait Decode: Sized {
    /// Decode a complete response body.
    fn decode(data: &[u8]) -> Result<Self, AcmeError>;
}

impl<T> Decode for T
where
    T: DeserializeOwned,
{
    fn decode(data: &[u8]) -> Result<Self, AcmeError> {
        // Empty bodies (e.g. from HEAD or a bare 200) decode as JSON null.
        let data = if data.iter().all(u8::is_ascii_whitespace) {
            b"null".as_slice()
        } else {
            data
        };
        serde_json::from_slice(data).map_err(AcmeError::de)
    }
}

/// Status, headers and decoded body of a provider response.
#[derive(Debug, Clone)]
pub struct Response<T> {
    url: Url,
    status: http::StatusCode,
    headers: http::HeaderMap,
    payload: T,
}

impl<T> Response<T>
where
    T: Decode,
{
    pub(crate) fn from_http(url: Url, response: http::Response<Vec<u8>>) -> Result<Self, AcmeError> {
        let (parts, body) = response.into_parts();
        let payload = T::decode(&body)?;

        Ok(Response {
            url,
            status: parts.status,
            headers: parts.headers,
            payload,
        })
    }
}

impl<T> Response<T> {
    /// HTTP status code.
    pub fn status(&self) -> http::StatusCode {
        self.status
    }

    /// The URL which was requested. Relative headers resolve against it.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// All response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `Retry-After`, as either delay seconds or an HTTP date.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        self.headers()
            .get(http::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| {
                if v.contains("GMT") {
                    DateTime::parse_from_rfc2822(v)
                        .map(|ts| ts.signed_duration_since(Utc::now()))
                        .ok()
                        .and_then(|d| d.to_std().ok())
                } else {
                    v.trim().parse::<u64>().ok().map(std::time::Duration::from_secs)
                }
            })
    }

    /// The `Replay-Nonce` header. [`super::AcmeClient`] already caches it.
    pub fn nonce(&self) -> Option<Nonce> {
        super::nonce::extract_nonce(&self.headers).ok()
    }

    /// The URL from the `Location` HTTP header, resolved against the request URL.
    pub fn location(&self) -> Option<Url> {
        let value = self.headers.get(http::header::LOCATION)?;
        let Ok(text) = value.to_str() else {
            tracing::warn!("{} header is not valid text", http::header::LOCATION);
            return None;
        };

        match self.url.join(text) {
            Ok(url) => Some(url.into()),
            Err(error) => {
                tracing::warn!("{} header is not a valid URL: {error}", http::header::LOCATION);
                None
            }
        }
    }

    /// Parsed `Content-Type`.
    pub fn content_type(&self) -> Option<mime::Mime> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// Relations from the `Link` headers.
    pub fn links(&self) -> Links {
        Links::from_headers(&self.headers, &self.url)
    }

    /// The decoded body.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Discard the headers.
    pub fn into_inner(self) -> T {
        self.payload
    }
}
