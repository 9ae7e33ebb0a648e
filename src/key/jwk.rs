//! JSON Web Keys and RFC 7638 thumbprints
use std::fmt;

use base64ct::Encoding;
use serde::ser::{self, SerializeStruct};
use sha2::Digest;

/// JSON Web Key structure for the public half of a signing key.
///
/// JWK serializes the information required to verify a signature in a
/// well-known JSON format. This is used to initially provide a key for an
/// ACME account, to sign external account bindings, and to roll over
/// account keys.
///
/// Members are always serialized in lexicographic order, so the serialized
/// form doubles as the canonical input for [`Jwk::thumbprint`].
#[derive(Clone, PartialEq, Eq)]
pub struct Jwk(InnerJwk);

#[derive(Clone, PartialEq, Eq)]
enum InnerJwk {
    EllipticCurve {
        crv: &'static str,
        x: String,
        y: String,
    },
    Rsa {
        n: String,
        e: String,
    },
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            InnerJwk::EllipticCurve { crv, .. } => f.debug_tuple("Jwk").field(crv).finish(),
            InnerJwk::Rsa { .. } => f.debug_tuple("Jwk").field(&"RSA").finish(),
        }
    }
}

impl Jwk {
    /// An elliptic curve key from its curve name and affine coordinates.
    pub(crate) fn elliptic_curve(crv: &'static str, x: &[u8], y: &[u8]) -> Self {
        Jwk(InnerJwk::EllipticCurve {
            crv,
            x: base64ct::Base64UrlUnpadded::encode_string(x),
            y: base64ct::Base64UrlUnpadded::encode_string(y),
        })
    }

    /// An RSA key from its big-endian modulus and public exponent.
    pub(crate) fn rsa(n: &[u8], e: &[u8]) -> Self {
        Jwk(InnerJwk::Rsa {
            n: base64ct::Base64UrlUnpadded::encode_string(n),
            e: base64ct::Base64UrlUnpadded::encode_string(e),
        })
    }

    /// The `kty` member of this key.
    pub fn key_type(&self) -> &'static str {
        match &self.0 {
            InnerJwk::EllipticCurve { .. } => "EC",
            InnerJwk::Rsa { .. } => "RSA",
        }
    }

    /// The required members in lexicographic order, with no whitespace.
    ///
    /// All member values are base64url strings or fixed names, so no JSON
    /// escaping is ever needed.
    fn canonical(&self) -> String {
        match &self.0 {
            InnerJwk::EllipticCurve { crv, x, y } => {
                format!(r#"{{"crv":"{crv}","kty":"EC","x":"{x}","y":"{y}"}}"#)
            }
            InnerJwk::Rsa { n, e } => format!(r#"{{"e":"{e}","kty":"RSA","n":"{n}"}}"#),
        }
    }

    /// An RFC 7638 thumbprint, which uniquely identifies this JWS cryptographic
    /// key.
    ///
    /// The thumbprint hash value can be used for identifying or selecting the key
    /// represented by the JWK that is the subject of the thumbprint.
    pub fn thumbprint(&self) -> String {
        let digest = sha2::Sha256::digest(self.canonical().as_bytes());
        base64ct::Base64UrlUnpadded::encode_string(&digest)
    }
}

impl ser::Serialize for Jwk {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match &self.0 {
            InnerJwk::EllipticCurve { crv, x, y } => {
                let mut state = serializer.serialize_struct("Jwk", 4)?;
                state.serialize_field("crv", crv)?;
                state.serialize_field("kty", "EC")?;
                state.serialize_field("x", x)?;
                state.serialize_field("y", y)?;
                state.end()
            }
            InnerJwk::Rsa { n, e } => {
                let mut state = serializer.serialize_struct("Jwk", 3)?;
                state.serialize_field("e", e)?;
                state.serialize_field("kty", "RSA")?;
                state.serialize_field("n", n)?;
                state.end()
            }
        }
    }
}
