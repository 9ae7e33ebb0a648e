use const_oid::db::rfc5912;
use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use signature::{SignatureEncoding, Signer};
use x509_cert::spki::AlgorithmIdentifierOwned;

use super::jwk::Jwk;
use super::Signature;
use crate::protocol::jose::SignatureAlgorithm;

/// RSA signature algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RsaAlgorithm {
    /// RSA PKCS#1 v1.5 signature using SHA-256
    RS256,

    /// RSA PKCS#1 v1.5 signature using SHA-384
    RS384,

    /// RSA PKCS#1 v1.5 signature using SHA-512
    RS512,
}

impl RsaAlgorithm {
    /// Modulus size used when none is given.
    pub const DEFAULT_KEY_SIZE: usize = 2048;

    pub(crate) fn random(&self, bits: usize) -> Result<RsaSigningKey, rsa::Error> {
        let keypair = rsa::RsaPrivateKey::new(&mut OsRng, bits)?;
        Ok(RsaSigningKey {
            algorithm: *self,
            keypair,
        })
    }

    /// The JWS algorithm name for this signature scheme.
    pub fn jws_algorithm(&self) -> SignatureAlgorithm {
        match self {
            RsaAlgorithm::RS256 => SignatureAlgorithm::RS256,
            RsaAlgorithm::RS384 => SignatureAlgorithm::RS384,
            RsaAlgorithm::RS512 => SignatureAlgorithm::RS512,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RsaSignature(rsa::pkcs1v15::Signature);

impl RsaSignature {
    pub(crate) fn to_bytes(&self) -> Box<[u8]> {
        self.0.to_vec().into()
    }
}

/// Implements the RSA signature scheme across algorithms
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RsaSigningKey {
    algorithm: RsaAlgorithm,
    keypair: rsa::RsaPrivateKey,
}

impl RsaSigningKey {
    pub(crate) fn from_pkcs8_der(data: &[u8], algorithm: RsaAlgorithm) -> Result<Self, pkcs8::Error> {
        let keypair = rsa::RsaPrivateKey::from_pkcs8_der(data)?;
        Ok(Self { algorithm, keypair })
    }

    pub(crate) fn algorithm(&self) -> RsaAlgorithm {
        self.algorithm
    }

    pub(crate) fn try_sign(&self, msg: &[u8]) -> Result<Signature, signature::Error> {
        let signature = match self.algorithm {
            RsaAlgorithm::RS256 => {
                rsa::pkcs1v15::SigningKey::<sha2::Sha256>::new(self.keypair.clone()).try_sign(msg)?
            }
            RsaAlgorithm::RS384 => {
                rsa::pkcs1v15::SigningKey::<sha2::Sha384>::new(self.keypair.clone()).try_sign(msg)?
            }
            RsaAlgorithm::RS512 => {
                rsa::pkcs1v15::SigningKey::<sha2::Sha512>::new(self.keypair.clone()).try_sign(msg)?
            }
        };
        Ok(RsaSignature(signature).into())
    }

    pub(crate) fn as_jwk(&self) -> Jwk {
        Jwk::rsa(
            &self.keypair.n().to_bytes_be(),
            &self.keypair.e().to_bytes_be(),
        )
    }

    pub(crate) fn signature_algorithm(&self) -> AlgorithmIdentifierOwned {
        let oid = match self.algorithm {
            RsaAlgorithm::RS256 => rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            RsaAlgorithm::RS384 => rfc5912::SHA_384_WITH_RSA_ENCRYPTION,
            RsaAlgorithm::RS512 => rfc5912::SHA_512_WITH_RSA_ENCRYPTION,
        };
        AlgorithmIdentifierOwned {
            oid,
            parameters: der::asn1::Any::new(der::Tag::Null, Vec::<u8>::new()).ok(),
        }
    }

    pub(crate) fn to_public_key_der(&self) -> pkcs8::spki::Result<der::Document> {
        self.keypair.to_public_key().to_public_key_der()
    }

    pub(crate) fn to_pkcs8_der(&self) -> pkcs8::Result<der::SecretDocument> {
        self.keypair.to_pkcs8_der()
    }
}
