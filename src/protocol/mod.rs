//! # Signed requests and the transport beneath them
//!
//! Every ACME request after the directory lookup is a flattened JWS, signed
//! by the account key (or, for a few requests, the certificate key). This
//! module builds those envelopes, keeps the single-use nonce the provider
//! hands out with each response, and decodes responses and error documents.
//!
//! [`AcmeClient`] ties these together over any [`HttpTransport`].
#![deny(unsafe_code)]
#![deny(missing_docs)]

use std::ops::Deref;
use std::str::FromStr;

mod base64;
pub mod client;
pub mod errors;
pub mod jose;
pub mod links;
pub mod nonce;
pub mod request;
pub mod response;
pub mod transport;

pub use base64::Base64Data;
pub use base64::Base64JSON;
pub use client::{AcmeClient, Client};
pub use errors::AcmeError;
pub use links::Links;
pub use transport::HttpTransport;

#[doc(no_inline)]
pub use request::Request;
#[doc(no_inline)]
pub use response::Response;
use serde::{Deserialize, Serialize};

/// A result type which uses [`AcmeError`] as the error type.
pub type Result<T> = ::std::result::Result<T, AcmeError>;

/// A URL handed out by the provider.
///
/// Debug output is the URL text, so request logs stay readable. Dereferences
/// to [`url::Url`] for everything else.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Url(url::Url);

impl Url {
    /// The URL text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The path component.
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// The host component, if any.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }
}

impl Deref for Url {
    type Target = url::Url;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<url::Url> for Url {
    fn from(value: url::Url) -> Self {
        Url(value)
    }
}

impl From<Url> for url::Url {
    fn from(value: Url) -> Self {
        value.0
    }
}

impl AsRef<str> for Url {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for Url {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Url").field(&self.0.as_str()).finish()
    }
}

impl FromStr for Url {
    type Err = url::ParseError;

    fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
        s.parse().map(Url)
    }
}
