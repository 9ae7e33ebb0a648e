//! PKCS#12 (PFX) bundles of a certificate, its issuers and private key.

use der::Decode as _;
use x509_cert::Certificate;

use crate::key::SigningKey;
use crate::protocol::{AcmeError, Result};

/// Builds a password protected PKCS#12 container.
///
/// ```no_run
/// # use acme_engine::cert::PfxBuilder;
/// # fn demo(leaf: &[u8], issuer: &[u8], key: &acme_engine::key::SigningKey) -> acme_engine::protocol::Result<()> {
/// let mut builder = PfxBuilder::new(leaf, key)?;
/// builder.add_issuer(issuer)?;
/// let pfx = builder.build("www.example.org", "hunter2")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PfxBuilder {
    certificate: Vec<u8>,
    key: der::SecretDocument,
    issuers: Vec<Vec<u8>>,
    full_chain: bool,
}

impl PfxBuilder {
    /// Start a bundle for the DER `certificate` and its private `key`.
    ///
    /// Fails when `certificate` is not a DER encoded X.509 certificate.
    pub fn new(certificate: &[u8], key: &SigningKey) -> Result<Self> {
        Certificate::from_der(certificate)?;
        Ok(PfxBuilder {
            certificate: certificate.to_vec(),
            key: key.to_pkcs8_der()?,
            issuers: Vec::new(),
            full_chain: true,
        })
    }

    /// Add a DER issuer certificate. Issuers are stored in the order added.
    pub fn add_issuer(&mut self, certificate: &[u8]) -> Result<&mut Self> {
        Certificate::from_der(certificate)?;
        self.issuers.push(certificate.to_vec());
        Ok(self)
    }

    /// Include the issuer certificates in the bundle (the default).
    pub fn full_chain(&mut self, full_chain: bool) -> &mut Self {
        self.full_chain = full_chain;
        self
    }

    /// Encode the bundle, protected by `password`.
    pub fn build(&self, friendly_name: &str, password: &str) -> Result<Vec<u8>> {
        let issuers: Vec<&[u8]> = if self.full_chain {
            self.issuers.iter().map(Vec::as_slice).collect()
        } else {
            Vec::new()
        };

        let pfx = p12::PFX::new_with_cas(
            &self.certificate,
            self.key.as_bytes(),
            &issuers,
            password,
            friendly_name,
        )
        .ok_or(AcmeError::Pkcs12("unable to encode certificate and key"))?;

        tracing::trace!(
            issuers = issuers.len(),
            "Built PKCS#12 bundle for {friendly_name}"
        );
        Ok(pfx.to_der())
    }
}

impl std::fmt::Debug for PfxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PfxBuilder")
            .field("issuers", &self.issuers.len())
            .field("full_chain", &self.full_chain)
            .finish_non_exhaustive()
    }
}
