//! ECDSA keys over the NIST prime curves

use const_oid::db::rfc5912;
use const_oid::ObjectIdentifier;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rand_core::OsRng;
use signature::Signer;
use x509_cert::spki::AlgorithmIdentifierOwned;

use super::jwk::Jwk;
use super::Signature;
use crate::protocol::jose::SignatureAlgorithm;

#[derive(Debug, Clone)]
pub(crate) enum EcdsaSignature {
    P256(p256::ecdsa::Signature),
    P384(p384::ecdsa::Signature),
    P521(p521::ecdsa::Signature),
}

impl EcdsaSignature {
    /// The fixed-width `r || s` form used by JWS.
    pub(crate) fn to_bytes(&self) -> Box<[u8]> {
        match self {
            EcdsaSignature::P256(signature) => signature.to_bytes().to_vec().into(),
            EcdsaSignature::P384(signature) => signature.to_bytes().to_vec().into(),
            EcdsaSignature::P521(signature) => signature.to_bytes().to_vec().into(),
        }
    }

    /// The ASN.1 `Ecdsa-Sig-Value` form used by X.509.
    pub(crate) fn to_der(&self) -> Vec<u8> {
        match self {
            EcdsaSignature::P256(signature) => signature.to_der().as_bytes().to_vec(),
            EcdsaSignature::P384(signature) => signature.to_der().as_bytes().to_vec(),
            EcdsaSignature::P521(signature) => signature.to_der().as_bytes().to_vec(),
        }
    }
}

/// Named elliptic curves supported for ECDSA keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcdsaAlgorithm {
    /// The NIST P-256 (a.k.a. secp256r1, prime256v1) elliptic curve, signing with SHA-256.
    P256,
    /// The NIST P-384 (a.k.a. secp384r1) elliptic curve, signing with SHA-384.
    P384,
    /// The NIST P-521 (a.k.a. secp521r1) elliptic curve, signing with SHA-512.
    P521,
}

impl EcdsaAlgorithm {
    pub(crate) fn random(&self) -> EcdsaSigningKey {
        match self {
            EcdsaAlgorithm::P256 => EcdsaSigningKey::P256(p256::SecretKey::random(&mut OsRng)),
            EcdsaAlgorithm::P384 => EcdsaSigningKey::P384(p384::SecretKey::random(&mut OsRng)),
            EcdsaAlgorithm::P521 => EcdsaSigningKey::P521(p521::SecretKey::random(&mut OsRng)),
        }
    }

    /// The JWS algorithm name for signatures made on this curve.
    pub fn jws_algorithm(&self) -> SignatureAlgorithm {
        match self {
            EcdsaAlgorithm::P256 => SignatureAlgorithm::ES256,
            EcdsaAlgorithm::P384 => SignatureAlgorithm::ES384,
            EcdsaAlgorithm::P521 => SignatureAlgorithm::ES512,
        }
    }

    /// The JWK `crv` name for this curve.
    pub fn curve_name(&self) -> &'static str {
        match self {
            EcdsaAlgorithm::P256 => "P-256",
            EcdsaAlgorithm::P384 => "P-384",
            EcdsaAlgorithm::P521 => "P-521",
        }
    }

    pub(crate) fn from_curve_oid(oid: ObjectIdentifier) -> Option<Self> {
        [
            (rfc5912::SECP_256_R_1, EcdsaAlgorithm::P256),
            (rfc5912::SECP_384_R_1, EcdsaAlgorithm::P384),
            (rfc5912::SECP_521_R_1, EcdsaAlgorithm::P521),
        ]
        .into_iter()
        .find_map(|(curve, algorithm)| (curve == oid).then_some(algorithm))
    }
}

/// Implements the ECDSA signature scheme across
/// the supported elliptic curves.
#[derive(Clone)]
pub(crate) enum EcdsaSigningKey {
    P256(p256::SecretKey),
    P384(p384::SecretKey),
    P521(p521::SecretKey),
}

impl EcdsaSigningKey {
    pub(crate) fn from_pkcs8_der(
        data: &[u8],
        algorithm: EcdsaAlgorithm,
    ) -> Result<Self, pkcs8::Error> {
        Ok(match algorithm {
            EcdsaAlgorithm::P256 => EcdsaSigningKey::P256(p256::SecretKey::from_pkcs8_der(data)?),
            EcdsaAlgorithm::P384 => EcdsaSigningKey::P384(p384::SecretKey::from_pkcs8_der(data)?),
            EcdsaAlgorithm::P521 => EcdsaSigningKey::P521(p521::SecretKey::from_pkcs8_der(data)?),
        })
    }

    pub(crate) fn algorithm(&self) -> EcdsaAlgorithm {
        match self {
            EcdsaSigningKey::P256(_) => EcdsaAlgorithm::P256,
            EcdsaSigningKey::P384(_) => EcdsaAlgorithm::P384,
            EcdsaSigningKey::P521(_) => EcdsaAlgorithm::P521,
        }
    }

    pub(crate) fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        let signature = match self {
            EcdsaSigningKey::P256(key) => {
                let signer = p256::ecdsa::SigningKey::from(key);
                let signature: p256::ecdsa::Signature = signer.try_sign(msg)?;
                EcdsaSignature::P256(signature)
            }
            EcdsaSigningKey::P384(key) => {
                let signer = p384::ecdsa::SigningKey::from(key);
                let signature: p384::ecdsa::Signature = signer.try_sign(msg)?;
                EcdsaSignature::P384(signature)
            }
            EcdsaSigningKey::P521(key) => {
                let signer = p521::ecdsa::SigningKey::from_bytes(&key.to_bytes())?;
                let signature: p521::ecdsa::Signature = signer.try_sign(msg)?;
                EcdsaSignature::P521(signature)
            }
        };
        Ok(signature.into())
    }

    pub(crate) fn as_jwk(&self) -> Jwk {
        let point = match self {
            EcdsaSigningKey::P256(key) => key.public_key().to_encoded_point(false).as_bytes().to_vec(),
            EcdsaSigningKey::P384(key) => key.public_key().to_encoded_point(false).as_bytes().to_vec(),
            EcdsaSigningKey::P521(key) => key.public_key().to_encoded_point(false).as_bytes().to_vec(),
        };

        // Uncompressed SEC1 points are 0x04 || x || y with equal-width coordinates.
        let coordinates = point.get(1..).unwrap_or_default();
        let (x, y) = coordinates.split_at(coordinates.len() / 2);
        Jwk::elliptic_curve(self.algorithm().curve_name(), x, y)
    }

    /// The X.509 signature algorithm for certificates signed by this key.
    pub(crate) fn signature_algorithm(&self) -> AlgorithmIdentifierOwned {
        let oid = match self {
            EcdsaSigningKey::P256(_) => rfc5912::ECDSA_WITH_SHA_256,
            EcdsaSigningKey::P384(_) => rfc5912::ECDSA_WITH_SHA_384,
            EcdsaSigningKey::P521(_) => rfc5912::ECDSA_WITH_SHA_512,
        };
        AlgorithmIdentifierOwned {
            oid,
            parameters: None,
        }
    }

    pub(crate) fn to_public_key_der(&self) -> pkcs8::spki::Result<der::Document> {
        match self {
            EcdsaSigningKey::P256(key) => key.public_key().to_public_key_der(),
            EcdsaSigningKey::P384(key) => key.public_key().to_public_key_der(),
            EcdsaSigningKey::P521(key) => key.public_key().to_public_key_der(),
        }
    }

    pub(crate) fn to_pkcs8_der(&self) -> pkcs8::Result<der::SecretDocument> {
        match self {
            EcdsaSigningKey::P256(key) => key.to_pkcs8_der(),
            EcdsaSigningKey::P384(key) => key.to_pkcs8_der(),
            EcdsaSigningKey::P521(key) => key.to_pkcs8_der(),
        }
    }
}
