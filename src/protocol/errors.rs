//! Error type shared by every layer of the engine.

use http::HeaderValue;
use thiserror::Error;

pub use self::acme::{AcmeErrorCode, AcmeErrorDocument};

/// Everything that can go wrong talking to an ACME provider.
///
/// Variants fall into four broad groups: transport failures (the request never
/// produced a usable response), protocol failures (the ACME provider returned an
/// [`AcmeErrorDocument`]), usage failures (the caller asked for something the
/// resource cannot provide) and capability failures (the provider does not
/// advertise the endpoint at all).
#[derive(Debug, Error)]
pub enum AcmeError {
    /// Problem document returned by the provider.
    #[error("An error occured with the ACME service: {0}")]
    Acme(#[source] self::acme::AcmeErrorDocument),

    /// Connection or protocol failure inside `reqwest`.
    #[error("An error occured during the network request: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// A custom transport failed to deliver the request.
    #[error("An error occured in the HTTP transport: {0}")]
    Transport(String),

    /// The ACME provider returned a non-success status without an error document.
    #[error("The ACME service returned HTTP {0}")]
    HttpStatus(http::StatusCode),

    /// An HTTP request could not be assembled.
    #[error("An error occured building the HTTP request: {0}")]
    HttpBuild(#[from] http::Error),

    /// A response body was not the expected JSON.
    #[error("An error occured deserializing JSON: {0}")]
    JsonDeserialize(#[source] serde_json::Error),

    /// A request payload failed to serialize.
    #[error("An error occured serializing JSON: {0}")]
    JsonSerialize(#[source] serde_json::Error),

    /// Malformed PEM, usually in a certificate chain.
    #[error("An error occured while deserializing a PEM document: {0}")]
    PemDecodeError(#[from] pem_rfc7468::Error),

    /// Malformed or unencodable DER.
    #[error("An error occured while deserializing a DER binary: {0}")]
    DerDecodeError(#[from] der::Error),

    /// A text body was not UTF-8.
    #[error("The ACME Client encountered non utf-8 data: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// A private key could not be encoded or decoded as PKCS#8.
    #[error("An error occured handling a PKCS#8 key: {0}")]
    Pkcs8(#[from] pkcs8::Error),

    /// A public key could not be encoded as SubjectPublicKeyInfo.
    #[error("An error occured handling a public key: {0}")]
    Spki(#[from] pkcs8::spki::Error),

    /// An RSA key could not be generated or used.
    #[error("An error occured with an RSA key: {0}")]
    Rsa(#[from] rsa::Error),

    /// The key type is not supported.
    #[error("Unsupported key: {0}")]
    UnsupportedKey(String),

    /// A key could not be read by the key reader.
    #[error("Unable to read key {path}: {source}")]
    KeyRead {
        /// The location the key was read from.
        path: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The ACME provider sent a nonce header which is not valid text.
    #[error("The nonce header returned was not valid: {0:?}")]
    InvalidNonce(Option<HeaderValue>),

    /// Neither the response nor the `newNonce` endpoint produced a nonce.
    #[error("No Nonce header was returned with the request")]
    MissingNonce,

    /// A request could not be signed.
    #[error("An error occured while signing the JWS token: {0}")]
    Signing(#[from] signature::Error),

    /// A PKCS#12 bundle could not be assembled.
    #[error("An error occured building a PKCS#12 bundle: {0}")]
    Pkcs12(&'static str),

    /// A resource lacks a field needed for the requested operation.
    #[error("Required data is missing: {0}")]
    MissingData(&'static str),

    /// The ACME provider's directory does not advertise the requested endpoint.
    #[error("The ACME service does not support {0}")]
    Unsupported(&'static str),

    /// A resource did not reach the required status, e.g. an order that
    /// stayed `processing` for every poll.
    #[error("{0} is not ready")]
    NotReady(&'static str),

    /// The authorization does not offer the requested challenge type.
    #[error("{0} is not an offered challenge type")]
    UnknownChallenge(String),
}

impl AcmeError {
    /// Wrap a response decoding failure.
    pub fn de(error: serde_json::Error) -> Self {
        AcmeError::JsonDeserialize(error)
    }

    /// Wrap a payload encoding failure.
    pub fn ser(error: serde_json::Error) -> Self {
        AcmeError::JsonSerialize(error)
    }

    /// The ACME error document, when this error was returned by the provider.
    pub fn document(&self) -> Option<&AcmeErrorDocument> {
        match self {
            AcmeError::Acme(document) => Some(document),
            _ => None,
        }
    }

    pub(crate) fn is_bad_nonce(&self) -> bool {
        matches!(self, AcmeError::Acme(document) if matches!(document.kind(), AcmeErrorCode::BadNonce))
    }
}

impl From<AcmeErrorDocument> for AcmeError {
    fn from(value: AcmeErrorDocument) -> Self {
        AcmeError::Acme(value)
    }
}

mod acme {
    use std::fmt;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::protocol::Url;

    const URN: &[&str; 5] = &["urn", "ietf", "params", "acme", "error"];

    /// An RFC 7807 problem document (`application/problem+json`).
    #[derive(Debug, Clone, Error, Serialize, Deserialize)]
    #[serde(from = "RawErrorInfo", into = "RawErrorInfo")]
    #[error("{code}: {detail}")]
    pub struct AcmeErrorDocument {
        code: AcmeErrorCode,
        detail: String,
        status: Option<u16>,
        terms_of_service: Option<Url>,
    }

    impl AcmeErrorDocument {
        /// Create a document by hand, e.g. when synthesizing provider errors.
        pub fn new(kind: &str, detail: impl Into<String>, status: Option<u16>) -> Self {
            AcmeErrorDocument {
                code: AcmeErrorCode::from(kind.to_owned()),
                detail: detail.into(),
                status,
                terms_of_service: None,
            }
        }

        /// Parsed `type` URN.
        pub fn kind(&self) -> &AcmeErrorCode {
            &self.code
        }

        /// Human readable `detail`.
        pub fn detail(&self) -> &str {
            &self.detail
        }

        /// The HTTP status code the provider reported for this error.
        pub fn status(&self) -> Option<u16> {
            self.status
        }

        /// Terms the account holder has to accept, from a
        /// `Link: rel="terms-of-service"` header on the error response.
        ///
        /// Sent with `userActionRequired` when the terms have changed.
        pub fn terms_of_service(&self) -> Option<&Url> {
            self.terms_of_service.as_ref()
        }

        pub(crate) fn with_status(mut self, status: u16) -> Self {
            self.status.get_or_insert(status);
            self
        }

        pub(crate) fn with_terms_of_service(mut self, terms_of_service: Option<Url>) -> Self {
            self.terms_of_service = terms_of_service;
            self
        }
    }

    /// The `type` of a problem document.
    ///
    /// Only the codes the engine acts on get their own variant.
    #[derive(Debug, Clone, PartialEq, Eq)]
    #[non_exhaustive]
    pub enum AcmeErrorCode {
        /// Retryable with a fresh nonce.
        BadNonce,

        /// The request asked for an existing account, and none exists for this key.
        AccountDoesNotExist,

        /// The account holder has to act out of band, usually to accept new terms.
        UserActionRequired,

        /// Some other error occured. The full URN is retained.
        Other(String),
    }

    impl AcmeErrorCode {
        /// The URN form of this code.
        pub fn urn(&self) -> String {
            match self {
                AcmeErrorCode::BadNonce => URN.join(":") + ":badNonce",
                AcmeErrorCode::AccountDoesNotExist => URN.join(":") + ":accountDoesNotExist",
                AcmeErrorCode::UserActionRequired => URN.join(":") + ":userActionRequired",
                AcmeErrorCode::Other(urn) => urn.clone(),
            }
        }
    }

    impl fmt::Display for AcmeErrorCode {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                AcmeErrorCode::BadNonce => f.write_str("an invalid nonce was sent"),
                AcmeErrorCode::AccountDoesNotExist => f.write_str("the account does not exist"),
                AcmeErrorCode::UserActionRequired => f.write_str("user action is required"),
                AcmeErrorCode::Other(message) => f.write_str(message),
            }
        }
    }

    impl From<String> for AcmeErrorCode {
        fn from(value: String) -> Self {
            let urn = value.split(':').collect::<Vec<_>>();

            if !urn
                .iter()
                .take(5)
                .zip(URN)
                .all(|(&part, &expected)| part == expected)
            {
                tracing::warn!("Unexpected URN: {value}");
            }

            match urn.get(5).copied() {
                Some("badNonce") => AcmeErrorCode::BadNonce,
                Some("accountDoesNotExist") => AcmeErrorCode::AccountDoesNotExist,
                Some("userActionRequired") => AcmeErrorCode::UserActionRequired,
                _ => AcmeErrorCode::Other(value),
            }
        }
    }

    /// Wire format for an ACME error document.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct RawErrorInfo {
        r#type: String,
        #[serde(default)]
        detail: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    }

    impl From<RawErrorInfo> for AcmeErrorDocument {
        fn from(value: RawErrorInfo) -> Self {
            AcmeErrorDocument {
                code: value.r#type.into(),
                detail: value.detail,
                status: value.status,
                terms_of_service: None,
            }
        }
    }

    impl From<AcmeErrorDocument> for RawErrorInfo {
        fn from(value: AcmeErrorDocument) -> Self {
            RawErrorInfo {
                r#type: value.code.urn(),
                detail: value.detail,
                status: value.status,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_nonce_document() {
        let response = crate::response!("bad-nonce.http");
        let document: AcmeErrorDocument = serde_json::from_str(response.body()).unwrap();
        assert_eq!(document.kind(), &AcmeErrorCode::BadNonce);
        assert_eq!(document.status(), Some(400));
        assert!(AcmeError::from(document).is_bad_nonce());
    }

    #[test]
    fn other_error_keeps_urn() {
        let document: AcmeErrorDocument = serde_json::from_str(
            r#"{"type": "urn:ietf:params:acme:error:rateLimited", "detail": "slow down"}"#,
        )
        .unwrap();
        assert_eq!(
            document.kind(),
            &AcmeErrorCode::Other("urn:ietf:params:acme:error:rateLimited".into())
        );
        assert_eq!(document.detail(), "slow down");
        assert!(document.status().is_none());

        let value = serde_json::to_value(&document).unwrap();
        assert_eq!(value["type"], "urn:ietf:params:acme:error:rateLimited");
    }
}
