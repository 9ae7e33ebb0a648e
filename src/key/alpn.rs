//! Self-signed certificates for `tls-alpn-01` validation (RFC 8737).
//!
//! The ACME provider connects to the identifier on port 443, negotiates the
//! `acme-tls/1` ALPN protocol, and expects a certificate for the identifier
//! carrying the SHA-256 of the key authorization in a critical
//! `acmeIdentifier` extension.

use std::str::FromStr;
use std::time::{Duration, SystemTime};

use const_oid::ObjectIdentifier;
use der::asn1::{Ia5String, OctetString, UtcTime};
use der::Encode;
use rand_core::{OsRng, RngCore};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::{Certificate, TbsCertificate, Version};

use super::{KeyAuthorization, SigningKey};
use crate::cert::PEM_TAG_CERTIFICATE;
use crate::protocol::Result;

/// `id-pe-acmeIdentifier`
pub const ID_PE_ACME_IDENTIFIER: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.1.31");

/// The ALPN protocol name the validation server must negotiate.
pub const ACME_TLS_ALPN_PROTOCOL: &str = "acme-tls/1";

const VALIDITY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A DER encoded, self-signed validation certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlpnCertificate(Vec<u8>);

impl AlpnCertificate {
    /// The certificate as ASN.1 DER.
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    /// The certificate as a PEM document.
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_rfc7468::encode_string(
            PEM_TAG_CERTIFICATE,
            base64ct::LineEnding::LF,
            &self.0,
        )?)
    }
}

/// Build the `tls-alpn-01` certificate for `domain`, signed by `key`.
///
/// `key` is the key the TLS server will present; it does not need to be
/// the account key.
pub fn tls_alpn01_certificate(
    key: &SigningKey,
    domain: &str,
    authorization: &KeyAuthorization,
) -> Result<AlpnCertificate> {
    let subject = Name::from_str(&format!("CN={domain}"))?;

    let mut serial = [0u8; 16];
    OsRng.fill_bytes(&mut serial);
    serial[0] = (serial[0] & 0x7f) | 0x40;

    let now = SystemTime::now();
    let validity = Validity {
        not_before: Time::UtcTime(UtcTime::from_system_time(now)?),
        not_after: Time::UtcTime(UtcTime::from_system_time(now + VALIDITY)?),
    };

    let san = SubjectAltName(vec![GeneralName::DnsName(Ia5String::new(domain)?)]);
    let san = Extension {
        extn_id: const_oid::db::rfc5280::ID_CE_SUBJECT_ALT_NAME,
        critical: false,
        extn_value: OctetString::new(san.to_der()?)?,
    };

    let identifier = OctetString::new(authorization.digest().to_vec())?;
    let identifier = Extension {
        extn_id: ID_PE_ACME_IDENTIFIER,
        critical: true,
        extn_value: OctetString::new(identifier.to_der()?)?,
    };

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&serial)?,
        signature: key.signature_algorithm(),
        issuer: subject.clone(),
        validity,
        subject,
        subject_public_key_info: key.subject_public_key_info()?,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: Some(vec![san, identifier]),
    };

    let signature = key.sign_x509(&tbs_certificate.to_der()?)?;
    let certificate = Certificate {
        tbs_certificate,
        signature_algorithm: key.signature_algorithm(),
        signature,
    };

    tracing::trace!(%domain, "Built tls-alpn-01 validation certificate");
    Ok(AlpnCertificate(certificate.to_der()?))
}
