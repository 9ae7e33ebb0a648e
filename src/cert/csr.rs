//! X.509 Certificate Signing Requests (PKCS#10)

use std::fmt;
use std::net::IpAddr;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, Ia5String, OctetString, PrintableStringRef, SetOfVec};
use der::{Encode, Tag};
use x509_cert::attr::{Attribute, AttributeTypeAndValue};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::request::{CertReq, CertReqInfo, Version};

use crate::key::SigningKey;
use crate::protocol::{AcmeError, Result};

const PEM_TAG_CSR: &str = "CERTIFICATE REQUEST";

const ID_AT_COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const ID_AT_COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const ID_AT_LOCALITY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const ID_AT_STATE_OR_PROVINCE_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const ID_AT_ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ID_AT_ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

/// Distinguished name fields for the subject of a certificate request.
///
/// ACME providers generally ignore everything here except the common name,
/// which must also appear among the subject alternative names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsrInfo {
    /// Two letter country code (`C`).
    pub country: Option<String>,
    /// State or province (`ST`).
    pub state: Option<String>,
    /// Locality (`L`).
    pub locality: Option<String>,
    /// Organization (`O`).
    pub organization: Option<String>,
    /// Organizational unit (`OU`).
    pub organization_unit: Option<String>,
    /// Common name (`CN`).
    pub common_name: Option<String>,
}

impl CsrInfo {
    /// Subject information with only a common name.
    pub fn common_name<S: Into<String>>(name: S) -> Self {
        CsrInfo {
            common_name: Some(name.into()),
            ..Default::default()
        }
    }

    fn fields(&self) -> impl Iterator<Item = (ObjectIdentifier, &str)> {
        [
            (ID_AT_COUNTRY_NAME, &self.country),
            (ID_AT_STATE_OR_PROVINCE_NAME, &self.state),
            (ID_AT_LOCALITY_NAME, &self.locality),
            (ID_AT_ORGANIZATION_NAME, &self.organization),
            (ID_AT_ORGANIZATIONAL_UNIT_NAME, &self.organization_unit),
            (ID_AT_COMMON_NAME, &self.common_name),
        ]
        .into_iter()
        .filter_map(|(oid, value)| value.as_deref().map(|value| (oid, value)))
    }

    fn to_name(&self) -> Result<Name> {
        let mut rdns = Vec::new();
        for (oid, value) in self.fields() {
            // Country names are restricted to PrintableString (RFC 5280 Appendix A).
            let value = if oid == ID_AT_COUNTRY_NAME {
                PrintableStringRef::new(value)?;
                Any::new(Tag::PrintableString, value.as_bytes())?
            } else {
                Any::new(Tag::Utf8String, value.as_bytes())?
            };

            let mut set = SetOfVec::new();
            set.insert(AttributeTypeAndValue { oid, value })?;
            rdns.push(RelativeDistinguishedName(set));
        }
        Ok(RdnSequence(rdns))
    }
}

/// Name to be certified by the certificate issued from this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedSubjectName {
    /// A name known to the Domain Name System, such as `www.example.com`
    Dns(String),

    /// An IP address
    Ip(IpAddr),
}

impl RequestedSubjectName {
    fn general_name(&self) -> Result<GeneralName> {
        Ok(match self {
            RequestedSubjectName::Dns(dns) => GeneralName::DnsName(Ia5String::new(dns)?),
            RequestedSubjectName::Ip(IpAddr::V4(ip)) => {
                GeneralName::IpAddress(OctetString::new(ip.octets().to_vec())?)
            }
            RequestedSubjectName::Ip(IpAddr::V6(ip)) => {
                GeneralName::IpAddress(OctetString::new(ip.octets().to_vec())?)
            }
        })
    }
}

impl fmt::Display for RequestedSubjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            RequestedSubjectName::Dns(dns) => write!(f, "DNS:{}", dns),
            RequestedSubjectName::Ip(ip) => write!(f, "IP:{}", ip),
        }
    }
}

impl From<String> for RequestedSubjectName {
    fn from(value: String) -> Self {
        RequestedSubjectName::Dns(value)
    }
}

impl From<&str> for RequestedSubjectName {
    fn from(value: &str) -> Self {
        Self::Dns(value.to_owned())
    }
}

impl From<IpAddr> for RequestedSubjectName {
    fn from(value: IpAddr) -> Self {
        RequestedSubjectName::Ip(value)
    }
}

/// The informational data in a certificate signing request sufficient to
/// fulfill an ACME certificate signing order's finalize step.
///
/// All names are carried in a "SubjectAltNames" extension request. The subject
/// is built from [`CsrInfo`], and may be empty, in which case the extension is
/// marked critical.
#[derive(Debug, Default)]
pub struct CertificateSigningRequest {
    info: CsrInfo,
    names: Vec<RequestedSubjectName>,
}

impl CertificateSigningRequest {
    /// Create a new certificate signing request with no names.
    pub fn new(info: CsrInfo) -> Self {
        CertificateSigningRequest {
            info,
            names: Vec::new(),
        }
    }

    /// Number of names in this CSR
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// CSR contains no names
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Add a subject name to this certificate signing request
    pub fn push<N>(&mut self, name: N)
    where
        N: Into<RequestedSubjectName>,
    {
        let name = name.into();
        if !self.names.contains(&name) {
            self.names.push(name)
        }
    }

    /// Sign this request with a [`SigningKey`], creating an X.509 certificate
    /// signing request, serialized using ASN.1 DER.
    ///
    /// The [`SigningKey`] here should not be the same as the account key used
    /// in the rest of the ACME protocol.
    pub fn sign(self, key: &SigningKey) -> Result<SignedCertificateRequest> {
        if self.names.is_empty() {
            return Err(AcmeError::MissingData("subject alternative names"));
        }

        let subject = self.info.to_name()?;

        let names = self
            .names
            .iter()
            .map(RequestedSubjectName::general_name)
            .collect::<Result<Vec<_>>>()?;

        let extension = Extension {
            extn_id: const_oid::db::rfc5280::ID_CE_SUBJECT_ALT_NAME,
            critical: subject.0.is_empty(),
            extn_value: OctetString::new(SubjectAltName(names).to_der()?)?,
        };

        // extensionRequest carries a SEQUENCE OF Extension.
        let extensions = Any::new(Tag::Sequence, extension.to_der()?)?;
        let mut values = SetOfVec::new();
        values.insert(extensions)?;

        let mut attributes = SetOfVec::new();
        attributes.insert(Attribute {
            oid: const_oid::db::rfc5912::ID_EXTENSION_REQ,
            values,
        })?;

        let info = CertReqInfo {
            version: Version::V1,
            subject,
            public_key: key.subject_public_key_info()?,
            attributes,
        };

        let signature = key.sign_x509(&info.to_der()?)?;
        let csr = CertReq {
            info,
            algorithm: key.signature_algorithm(),
            signature,
        };

        tracing::trace!(names = self.names.len(), "Signed certificate request");
        Ok(SignedCertificateRequest(csr.to_der()?))
    }
}

/// A certificate request, cryptographically signed, and encoded as ASN.1 DER
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCertificateRequest(Vec<u8>);

impl SignedCertificateRequest {
    /// The DER bytes, as submitted to finalize an order.
    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    /// Encode this CSR as a PEM document.
    pub fn to_pem(&self) -> Result<String> {
        Ok(pem_rfc7468::encode_string(
            PEM_TAG_CSR,
            base64ct::LineEnding::LF,
            &self.0,
        )?)
    }
}

impl AsRef<[u8]> for SignedCertificateRequest {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}
