//! # Authorization of identifiers, and the associated challenges
//!
//! Authorizations prove that the ACME account controls the identifier (e.g. domain name) in
//! question, usually by asking the account to change some externally visible value.

use crate::protocol::{AcmeError, Response, Result, Url};
use crate::schema::challenges::ChallengeKind;
use crate::schema::{self, Deactivate};

use super::{AcmeContext, ChallengeContext};

/// An authorization attached to an order, proving that the account controls
/// one identifier.
///
/// Only one of the offered challenges needs to be completed.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    context: AcmeContext,
    location: Url,
}

impl AuthorizationContext {
    pub(crate) fn new(context: AcmeContext, location: Url) -> Self {
        Self { context, location }
    }

    /// Identifying URL for this authorization
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Fetch the authorization from the provider.
    pub async fn resource(&self) -> Result<schema::Authorization> {
        let response: Response<schema::Authorization> = self.context.fetch(&self.location).await?;
        Ok(response.into_inner())
    }

    /// Every challenge offered for this authorization.
    pub async fn challenges(&self) -> Result<Vec<ChallengeContext>> {
        let authorization = self.resource().await?;
        Ok(authorization
            .challenges
            .into_iter()
            .map(|challenge| ChallengeContext::new(self.context.clone(), challenge))
            .collect())
    }

    /// The first offered challenge of `kind`.
    pub async fn challenge(&self, kind: ChallengeKind) -> Result<ChallengeContext> {
        let authorization = self.resource().await?;
        let challenge = authorization
            .challenge(&kind)
            .cloned()
            .ok_or_else(|| AcmeError::UnknownChallenge(kind.name().to_owned()))?;
        Ok(ChallengeContext::new(self.context.clone(), challenge))
    }

    /// The `http-01` challenge.
    pub async fn http(&self) -> Result<ChallengeContext> {
        self.challenge(ChallengeKind::Http01).await
    }

    /// The `dns-01` challenge.
    pub async fn dns(&self) -> Result<ChallengeContext> {
        self.challenge(ChallengeKind::Dns01).await
    }

    /// The `tls-alpn-01` challenge.
    pub async fn tls_alpn(&self) -> Result<ChallengeContext> {
        self.challenge(ChallengeKind::TlsAlpn01).await
    }

    /// Give up on this authorization.
    pub async fn deactivate(&self) -> Result<schema::Authorization> {
        let response: Response<schema::Authorization> =
            self.context.post(&self.location, Deactivate::default()).await?;
        let authorization = response.into_inner();
        tracing::debug!(
            authorization = %self.location.as_str(),
            status = ?authorization.status,
            "Deactivated authorization"
        );
        Ok(authorization)
    }
}
