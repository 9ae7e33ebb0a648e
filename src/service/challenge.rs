//! # ACME Challenges
//!
//! A challenge is one way to prove to the ACME service provider that
//! this account controls the identifier (e.g. domain name) in question.

use crate::key::alpn::{tls_alpn01_certificate, AlpnCertificate};
use crate::key::{KeyAuthorization, SigningKey};
use crate::protocol::{AcmeError, Response, Result, Url};
use crate::schema::challenges::{ChallengeKind, ChallengeReadyRequest};
use crate::schema::Challenge;

use super::AcmeContext;

/// One challenge offered within an authorization.
///
/// The kind, token and location are taken from the authorization the
/// challenge was listed in. Use [`ChallengeContext::resource`] for its current
/// status.
#[derive(Debug, Clone)]
pub struct ChallengeContext {
    context: AcmeContext,
    challenge: Challenge,
}

impl ChallengeContext {
    pub(crate) fn new(context: AcmeContext, challenge: Challenge) -> Self {
        Self { context, challenge }
    }

    /// The kind of challenge - HTTP-01, DNS-01, etc.
    pub fn kind(&self) -> ChallengeKind {
        *self.challenge.kind()
    }

    /// The challenge token.
    pub fn token(&self) -> Option<&str> {
        self.challenge.token()
    }

    /// Identifying URL for this challenge
    pub fn location(&self) -> &Url {
        self.challenge.url()
    }

    /// The key authorization for this challenge and the account key.
    pub fn key_authorization(&self) -> Result<KeyAuthorization> {
        self.challenge
            .authorization(self.context.account_key())
            .ok_or(AcmeError::MissingData("challenge token"))
    }

    /// The value of the `dns-01` TXT record.
    pub fn dns_value(&self) -> Result<String> {
        Ok(self.key_authorization()?.dns_value())
    }

    /// A `tls-alpn-01` validation certificate for `domain`, signed by `key`.
    pub fn tls_alpn_certificate(&self, domain: &str, key: &SigningKey) -> Result<AlpnCertificate> {
        tls_alpn01_certificate(key, domain, &self.key_authorization()?)
    }

    /// Fetch the challenge from the provider.
    pub async fn resource(&self) -> Result<Challenge> {
        let response: Response<Challenge> = self.context.fetch(self.location()).await?;
        Ok(response.into_inner())
    }

    /// Notify the provider that the challenge is ready to be validated.
    pub async fn validate(&self) -> Result<Challenge> {
        tracing::trace!(kind = %self.kind(), "Notifying that challenge is ready");
        let response: Response<Challenge> = self
            .context
            .post(self.location(), ChallengeReadyRequest)
            .await?;
        let challenge = response.into_inner();
        tracing::debug!(kind = %self.kind(), status = ?challenge.status(), "Challenge submitted");
        Ok(challenge)
    }
}
