//! # Certificate revocation
//!
//! Payloads sent to the `revokeCert` endpoint (RFC 8555 §7.6).

use serde::{Serialize, Serializer};

use crate::protocol::Base64Data;

/// CRL reason codes a certificate may be revoked for (RFC 5280 §5.3.1).
///
/// Code 7 is unassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RevocationReason {
    /// No reason given.
    #[default]
    Unspecified,
    /// The certificate key was compromised.
    KeyCompromise,
    /// The issuing CA key was compromised.
    CaCompromise,
    /// The subject's affiliation has changed.
    AffiliationChanged,
    /// The certificate was replaced.
    Superseded,
    /// The certificate is no longer needed.
    CessationOfOperation,
    /// The certificate is on hold.
    CertificateHold,
    /// The certificate is released from hold.
    RemoveFromCrl,
    /// A privilege granted by the certificate was withdrawn.
    PrivilegeWithdrawn,
    /// An attribute authority was compromised.
    AaCompromise,
}

impl RevocationReason {
    /// The numeric CRL reason code.
    pub fn code(&self) -> u8 {
        match self {
            RevocationReason::Unspecified => 0,
            RevocationReason::KeyCompromise => 1,
            RevocationReason::CaCompromise => 2,
            RevocationReason::AffiliationChanged => 3,
            RevocationReason::Superseded => 4,
            RevocationReason::CessationOfOperation => 5,
            RevocationReason::CertificateHold => 6,
            RevocationReason::RemoveFromCrl => 8,
            RevocationReason::PrivilegeWithdrawn => 9,
            RevocationReason::AaCompromise => 10,
        }
    }
}

impl Serialize for RevocationReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

/// Request to revoke a certificate.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRevocation {
    certificate: Base64Data<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<RevocationReason>,
}

impl CertificateRevocation {
    /// Revoke the DER encoded `certificate`.
    pub fn new(certificate: &[u8], reason: Option<RevocationReason>) -> Self {
        CertificateRevocation {
            certificate: Base64Data(certificate.to_vec()),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_skip_seven() {
        assert_eq!(RevocationReason::CertificateHold.code(), 6);
        assert_eq!(RevocationReason::RemoveFromCrl.code(), 8);
        assert_eq!(
            serde_json::to_value(RevocationReason::AaCompromise).unwrap(),
            serde_json::json!(10)
        );
    }

    #[test]
    fn revocation_payload() {
        let request = CertificateRevocation::new(&[0x30, 0x82, 0xff], Some(RevocationReason::KeyCompromise));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"certificate": "MIL_", "reason": 1})
        );

        let request = CertificateRevocation::new(&[0x30, 0x82, 0xff], None);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({"certificate": "MIL_"})
        );
    }
}
