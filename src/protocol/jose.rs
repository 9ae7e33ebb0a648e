//! JWS building blocks for ACME requests.
//!
//! Every ACME request body is a flattened JWS: a base64url protected header,
//! a base64url payload (empty for POST-as-GET) and a signature over
//! `header.payload`.

use std::ops::Deref;
use std::sync::Arc;

use serde::{ser, Deserialize, Serialize};
use thiserror::Error;

use super::base64::{Base64Data, Base64JSON};
use super::errors::AcmeError;
use super::Url;

use crate::key::jwk::Jwk;
use crate::key::{Signature, SigningKey};

/// `alg` values this crate can produce.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    RS256,
    /// RSASSA-PKCS1-v1_5 using SHA-384
    RS384,
    /// RSASSA-PKCS1-v1_5 using SHA-512
    RS512,
    /// ECDSA P-256 with SHA-256
    ES256,
    /// ECDSA P-384 with SHA-384
    ES384,
    /// ECDSA P-521 with SHA-512
    ES512,
    /// Only used for external account binding.
    HS256,
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignatureAlgorithm::RS256 => "RS256",
            SignatureAlgorithm::RS384 => "RS384",
            SignatureAlgorithm::RS512 => "RS512",
            SignatureAlgorithm::ES256 => "ES256",
            SignatureAlgorithm::ES384 => "ES384",
            SignatureAlgorithm::ES512 => "ES512",
            SignatureAlgorithm::HS256 => "HS256",
        };
        f.write_str(name)
    }
}

/// Single-use anti-replay token from the `Replay-Nonce` header.
///
/// Opaque to the client. Fresh ones come with every response, or from a
/// `HEAD` to the `newNonce` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Nonce(String);

impl AsRef<str> for Nonce {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl From<String> for Nonce {
    fn from(value: String) -> Self {
        Nonce(value)
    }
}

impl From<&str> for Nonce {
    fn from(value: &str) -> Self {
        Nonce(value.to_owned())
    }
}

/// The `kid` of a registered account, which is its account URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKeyIdentifier(Arc<Url>);

impl ser::Serialize for AccountKeyIdentifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.deref().serialize(serializer)
    }
}

impl From<Url> for AccountKeyIdentifier {
    fn from(value: Url) -> Self {
        AccountKeyIdentifier(Arc::new(value))
    }
}

impl AccountKeyIdentifier {
    /// The account URL.
    pub fn to_url(&self) -> Url {
        self.0.deref().clone()
    }
}

/// JWS protected header: `alg`, `kid` or `jwk`, `nonce` and `url`.
///
/// Absent fields are omitted when serialized. `KI` is the type of `kid`,
/// an account URL for ACME requests or a provider string for external
/// account binding.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "KI: Serialize"))]
pub struct ProtectedHeader<KI> {
    #[serde(rename = "alg")]
    algorithm: SignatureAlgorithm,
    #[serde(rename = "kid", skip_serializing_if = "Option::is_none")]
    key_id: Option<KI>,
    #[serde(rename = "jwk", skip_serializing_if = "Option::is_none")]
    web_key: Option<Jwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nonce: Option<Nonce>,
    url: Url,
}

impl<KI> ProtectedHeader<KI> {
    /// Supply exactly one of `key_id` and `web_key`.
    pub fn new(
        algorithm: SignatureAlgorithm,
        key_id: Option<KI>,
        web_key: Option<Jwk>,
        url: Url,
        nonce: Option<Nonce>,
    ) -> Self {
        Self {
            algorithm,
            key_id,
            web_key,
            nonce,
            url,
        }
    }

    /// The signature algorithm named in this header.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// The target URL named in this header.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Used when a request is retried after `badNonce`.
    pub fn replace_nonce(&mut self, nonce: Nonce) {
        self.nonce = Some(nonce);
    }
}

/// Header for requests signed by an account key.
pub type AcmeProtectedHeader<'k> = ProtectedHeader<&'k AccountKeyIdentifier>;

impl<'k> ProtectedHeader<&'k AccountKeyIdentifier> {
    /// `jwk` form, for requests made before the account URL is known.
    pub fn new_acme_header(key: &SigningKey, url: Url, nonce: Option<Nonce>) -> Self {
        Self {
            algorithm: key.jws_algorithm(),
            web_key: Some(key.as_jwk()),
            key_id: None,
            nonce,
            url,
        }
    }

    /// `kid` form. A nonce is mandatory here.
    pub fn new_acme_account_header(
        key: &SigningKey,
        account: &'k AccountKeyIdentifier,
        url: Url,
        nonce: Nonce,
    ) -> Self {
        Self {
            algorithm: key.jws_algorithm(),
            web_key: None,
            key_id: Some(account),
            nonce: Some(nonce),
            url,
        }
    }
}

#[derive(Debug, Clone)]
enum Payload<P> {
    Json(Base64JSON<P>),
    Empty,
}

impl<P> Payload<P>
where
    P: Serialize,
{
    fn serialized_value(&self) -> Result<String, serde_json::Error> {
        match self {
            Payload::Json(data) => data.serialized_value(),
            Payload::Empty => Ok("".to_owned()),
        }
    }
}

impl<P> ser::Serialize for Payload<P>
where
    P: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Payload::Json(data) => data.serialize(serializer),
            Payload::Empty => serializer.serialize_str(""),
        }
    }
}

/// Header and payload, before signing.
#[derive(Debug, Clone, Serialize)]
pub struct UnsignedToken<P, KI> {
    protected: Base64JSON<ProtectedHeader<KI>>,
    payload: Payload<P>,
}

impl<P, KI> UnsignedToken<P, KI> {
    /// POST-as-GET: the payload is the empty string.
    pub fn get(protected: ProtectedHeader<KI>) -> Self {
        Self {
            protected: protected.into(),
            payload: Payload::Empty,
        }
    }

    /// Payload is `payload` as JSON.
    pub fn post(protected: ProtectedHeader<KI>, payload: P) -> Self {
        Self {
            protected: protected.into(),
            payload: Payload::Json(payload.into()),
        }
    }

    /// The protected header of this token.
    pub fn header(&self) -> &ProtectedHeader<KI> {
        &self.protected.0
    }
}

impl<P, KI> UnsignedToken<P, KI>
where
    P: Serialize,
    KI: Serialize,
{
    /// The bytes covered by the signature: `base64url(header) "." base64url(payload)`.
    pub fn signing_input(&self) -> Result<String, SigningError> {
        let header = self
            .protected
            .serialized_value()
            .map_err(SigningError::JsonSerialize)?;
        let payload = self
            .payload
            .serialized_value()
            .map_err(SigningError::JsonSerialize)?;
        Ok(format!("{header}.{payload}"))
    }

    /// Sign with an asymmetric key.
    pub fn sign<K>(self, key: &K) -> Result<SignedToken<P, KI>, SigningError>
    where
        K: signature::Signer<Signature>,
    {
        let message = self.signing_input()?;
        let signature = key.try_sign(message.as_bytes())?;
        Ok(SignedToken {
            target: self,
            signature: Base64Data(signature.to_bytes()),
        })
    }

    /// MAC with a keyed HMAC instead of signing.
    pub fn digest<D: hmac::Mac>(self, mut digest: D) -> Result<SignedToken<P, KI>, SigningError> {
        let message = self.signing_input()?;
        digest.update(message.as_bytes());
        let result = digest.finalize();
        Ok(SignedToken {
            target: self,
            signature: Base64Data(Box::from(result.into_bytes().as_slice())),
        })
    }
}

/// Flattened JWS JSON: `protected`, `payload` and `signature`.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "UnsignedToken<P, KI>: Serialize"))]
pub struct SignedToken<P, KI> {
    #[serde(flatten)]
    target: UnsignedToken<P, KI>,
    signature: Base64Data<Box<[u8]>>,
}

impl<P, KI> SignedToken<P, KI> {
    /// The protected header of this token.
    pub fn header(&self) -> &ProtectedHeader<KI> {
        self.target.header()
    }

    /// The raw signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature.0
    }
}

/// Failure to produce a signed token.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The key failed to sign.
    #[error("signature error")]
    Signing(#[from] signature::Error),

    /// The header or payload failed to serialize.
    #[error("serialization error: {0}")]
    JsonSerialize(#[source] serde_json::Error),
}

impl From<SigningError> for AcmeError {
    fn from(value: SigningError) -> Self {
        match value {
            SigningError::Signing(error) => Self::Signing(error),
            SigningError::JsonSerialize(error) => Self::ser(error),
        }
    }
}
