//! # Certificate codecs
//!
//! Certificate signing requests for order finalization, parsing of the PEM
//! chains returned by the ACME provider, and PKCS#12 bundles for servers
//! which want the certificate and key in one file.

#![deny(unsafe_code)]
#![deny(missing_docs)]

pub mod chain;
pub mod csr;
pub mod pfx;

pub use self::chain::{CertificateChain, CertificateInfo};
pub use self::csr::{CertificateSigningRequest, CsrInfo, RequestedSubjectName, SignedCertificateRequest};
pub use self::pfx::PfxBuilder;

pub(crate) const PEM_TAG_CERTIFICATE: &str = "CERTIFICATE";
