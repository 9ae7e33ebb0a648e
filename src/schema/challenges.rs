//! # ACME Challenges
//!
//! Challenges used to validate ownership of an identifier, as part
//! of an authorization.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{ser, Deserialize, Serialize};

use crate::key::{KeyAuthorization, SigningKey};
use crate::protocol::errors::AcmeErrorDocument;
use crate::protocol::Url;

/// A challenge offered by the provider within an authorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    #[serde(rename = "type")]
    kind: ChallengeKind,
    url: Url,
    status: ChallengeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    validated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<AcmeErrorDocument>,
}

impl Challenge {
    /// The kind of challenge - HTTP-01, DNS-01, etc.
    pub fn kind(&self) -> &ChallengeKind {
        &self.kind
    }

    /// The URL of the challenge, which can be used to get updates, or to indicate
    /// that the challenge is ready for validation by the ACME provider.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Status of the challenge.
    pub fn status(&self) -> ChallengeStatus {
        self.status
    }

    /// The token used for challenge validation.
    ///
    /// Every challenge type defined by RFC 8555 and RFC 8737 carries one.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Has the provider validated this challenge?
    pub fn is_finished(&self) -> bool {
        matches!(self.status, ChallengeStatus::Valid | ChallengeStatus::Invalid)
    }

    /// Has the provider validated this challenge and found it to be valid?
    pub fn is_valid(&self) -> bool {
        matches!(self.status, ChallengeStatus::Valid)
    }

    /// When was this challenge validated?
    pub fn validated_at(&self) -> Option<DateTime<Utc>> {
        self.validated
    }

    /// Get the error document, if this challenge has failed.
    pub fn error(&self) -> Option<&AcmeErrorDocument> {
        self.error.as_ref()
    }

    /// Get the key authorization, used to validate the challenge.
    pub fn authorization(&self, account_key: &SigningKey) -> Option<KeyAuthorization> {
        self.token().map(|token| account_key.key_authorization(token))
    }

    /// The path where an `http-01` key authorization should be served.
    pub fn http01_path(&self) -> Option<String> {
        match (&self.kind, self.token()) {
            (ChallengeKind::Http01, Some(token)) => {
                Some(format!("/.well-known/acme-challenge/{token}"))
            }
            _ => None,
        }
    }

    /// The name of the `dns-01` TXT record for `domain`.
    ///
    /// Wildcard domains use the record of their base domain.
    pub fn dns01_record(domain: &str) -> String {
        let domain = domain.strip_prefix("*.").unwrap_or(domain);
        format!("_acme-challenge.{domain}.")
    }
}

/// State of the ACME challenge.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    /// This challenge has not been submitted.
    Pending,
    /// The client has indicated that this challenge is ready to be validated, but
    /// the server has not yet validated it.
    Processing,

    /// The server has validated this challenge.
    Valid,

    /// The server has validated this challenge, but the validation failed.
    Invalid,
}

/// The different kinds of ACME challenges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ChallengeKind {
    /// The HTTP-01 challenge.
    #[serde(rename = "http-01")]
    Http01,

    /// The DNS-01 challenge.
    #[serde(rename = "dns-01")]
    Dns01,

    /// The TLS-ALPN-01 challenge (RFC 8737).
    #[serde(rename = "tls-alpn-01")]
    TlsAlpn01,

    /// Another challenge type.
    #[serde(other)]
    Unknown,
}

impl ChallengeKind {
    /// The name of the challenge type.
    pub fn name(&self) -> &'static str {
        match self {
            ChallengeKind::Http01 => "http-01",
            ChallengeKind::Dns01 => "dns-01",
            ChallengeKind::TlsAlpn01 => "tls-alpn-01",
            ChallengeKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An empty request to indicate that the challenge is ready to be validated.
#[derive(Debug, Default)]
pub struct ChallengeReadyRequest;

impl ser::Serialize for ChallengeReadyRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let map = serializer.serialize_map(Some(0))?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn challenges() -> Vec<Challenge> {
        let response = crate::response!("authorization.http");
        let value: serde_json::Value = serde_json::from_str(response.body()).unwrap();
        serde_json::from_value(value["challenges"].clone()).unwrap()
    }

    #[test]
    fn challenge_kinds() {
        let kinds: Vec<_> = challenges().iter().map(|c| *c.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                ChallengeKind::Http01,
                ChallengeKind::Dns01,
                ChallengeKind::TlsAlpn01
            ]
        );

        let unknown: Challenge = serde_json::from_str(
            r#"{"type": "onion-csr-01", "url": "https://example.com/c/1", "status": "pending"}"#,
        )
        .unwrap();
        assert_eq!(unknown.kind(), &ChallengeKind::Unknown);
        assert!(unknown.token().is_none());
    }

    #[test]
    fn http01_path_and_authorization() {
        let key = crate::key!("ec-p256");
        let http = &challenges()[0];
        assert_eq!(
            http.http01_path().unwrap(),
            "/.well-known/acme-challenge/DGyRejmCefe7v4NfDGDKfA"
        );
        assert_eq!(
            http.authorization(&key).unwrap().as_str(),
            format!("DGyRejmCefe7v4NfDGDKfA.{}", key.thumbprint())
        );
        assert!(challenges()[1].http01_path().is_none());
    }

    #[test]
    fn dns01_record_name() {
        assert_eq!(
            Challenge::dns01_record("www.example.org"),
            "_acme-challenge.www.example.org."
        );
        assert_eq!(
            Challenge::dns01_record("*.example.org"),
            "_acme-challenge.example.org."
        );
    }

    #[test]
    fn validated_challenge() {
        let response = crate::response!("challenge-valid.http");
        let challenge: Challenge = serde_json::from_str(response.body()).unwrap();
        assert!(challenge.is_valid());
        assert!(challenge.is_finished());
        assert!(challenge.validated_at().is_some());
    }

    #[test]
    fn ready_request_is_empty_object() {
        assert_eq!(serde_json::to_string(&ChallengeReadyRequest).unwrap(), "{}");
    }
}
