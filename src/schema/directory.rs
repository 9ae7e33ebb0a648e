//! The provider directory, fetched once to discover every other endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::{AcmeError, Url};

/// Directories are the single source required to configure an ACME client
/// for use with a specific provider. They can be fetched as JSON from an
/// advertised directory URL.
///
/// Every endpoint is optional here so that a provider which leaves one out
/// produces an [`AcmeError::Unsupported`] when (and only when) that endpoint
/// is used. See [`Directory::endpoint`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directory {
    /// URL used to fetch a new Nonce via a HEAD request
    #[serde(default)]
    pub new_nonce: Option<Url>,

    /// URL to create a new account
    #[serde(default)]
    pub new_account: Option<Url>,

    /// URL to create a new certificate order
    #[serde(default)]
    pub new_order: Option<Url>,

    /// (optional) URL to start a new pre-authorization
    #[serde(default)]
    pub new_authz: Option<Url>,

    /// URL to revoke an existing certificate
    #[serde(default)]
    pub revoke_cert: Option<Url>,

    /// URL to change the account signing key
    #[serde(default)]
    pub key_change: Option<Url>,

    /// Additional metadata
    #[serde(default)]
    pub meta: Option<Metadata>,
}

/// Named endpoints advertised in a [`Directory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `newNonce`
    NewNonce,
    /// `newAccount`
    NewAccount,
    /// `newOrder`
    NewOrder,
    /// `newAuthz`
    NewAuthz,
    /// `revokeCert`
    RevokeCert,
    /// `keyChange`
    KeyChange,
}

impl Endpoint {
    /// The resource name used by RFC 8555.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::NewNonce => "new-nonce",
            Endpoint::NewAccount => "new-account",
            Endpoint::NewOrder => "new-order",
            Endpoint::NewAuthz => "new-authz",
            Endpoint::RevokeCert => "revoke-cert",
            Endpoint::KeyChange => "key-change",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Directory {
    /// The URL for `endpoint`, or [`AcmeError::Unsupported`] when the provider
    /// does not advertise it.
    pub fn endpoint(&self, endpoint: Endpoint) -> Result<&Url, AcmeError> {
        let url = match endpoint {
            Endpoint::NewNonce => &self.new_nonce,
            Endpoint::NewAccount => &self.new_account,
            Endpoint::NewOrder => &self.new_order,
            Endpoint::NewAuthz => &self.new_authz,
            Endpoint::RevokeCert => &self.revoke_cert,
            Endpoint::KeyChange => &self.key_change,
        };
        url.as_ref().ok_or(AcmeError::Unsupported(endpoint.name()))
    }

    /// The terms of service URL, if the provider publishes one.
    pub fn terms_of_service(&self) -> Option<&Url> {
        self.meta.as_ref().and_then(|meta| meta.terms_of_service.as_ref())
    }
}

/// Optional provider metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// A URL to find and display terms of service for the ACME server
    #[serde(default)]
    pub terms_of_service: Option<Url>,

    /// A URL for the default website of the ACME server
    #[serde(default)]
    pub website: Option<Url>,

    /// The hostnames that the ACME server recognizes as referring to itself for the purposes of
    /// CAA record validation as defined in [RFC6844](https://www.rfc-editor.org/rfc/rfc6844).
    /// Each string represents the same sequence of ASCII code points that the server
    /// will expect to see as the "Issuer Domain Name" in a CAA issue or
    /// issuewild property tag.  This allows clients to determine the
    /// correct issuer domain name to use when configuring CAA records.
    #[serde(default)]
    pub caa_identities: Vec<String>,

    /// Whether an external account registration is required to register with this provider.
    #[serde(default)]
    pub external_account_required: Option<bool>,
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::response;

    #[test]
    fn deserialize_directory() {
        let response = response!("directory.http");

        let directory: Directory = serde_json::from_str(response.body()).unwrap();
        assert_eq!(
            directory.endpoint(Endpoint::NewAccount).unwrap().as_str(),
            "https://example.com/acme/new-account"
        );
        assert_eq!(
            directory.terms_of_service().map(|url| url.as_str()),
            Some("https://example.com/acme/terms/2017-5-30")
        );
        let meta = directory.meta.unwrap();
        assert_eq!(meta.website, Some("https://www.example.com/".parse().unwrap()));
        assert_eq!(meta.caa_identities, vec!["example.com".to_owned()]);
    }

    #[test]
    fn absent_endpoints_are_unsupported() {
        let response = response!("directory-minimal.http");
        let directory: Directory = serde_json::from_str(response.body()).unwrap();

        assert!(directory.endpoint(Endpoint::NewOrder).is_ok());
        assert!(matches!(
            directory.endpoint(Endpoint::KeyChange),
            Err(AcmeError::Unsupported("key-change"))
        ));
        assert!(directory.terms_of_service().is_none());
    }
}
