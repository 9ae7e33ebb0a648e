//! # Certificate Orders
//!
//! Each order is for a single certificate chain, but that certificate chain
//! may cover multiple identities.

use std::sync::Arc;
use std::time::Duration;

use crate::cert::{
    CertificateChain, CertificateInfo, CertificateSigningRequest, CsrInfo, RequestedSubjectName,
};
use crate::key::SigningKey;
use crate::protocol::links::REL_ALTERNATE;
use crate::protocol::{AcmeError, Response, Result, Url};
use crate::schema::orders::{FinalizeOrder, OrderStatus};
use crate::schema::{self, Identifier};

use super::{AcmeContext, AuthorizationContext};

/// Delay between polls when the provider does not send `Retry-After`.
const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(1);

/// Polls allowed for an order to settle in [`OrderContext::generate`].
pub const DEFAULT_MAX_POLLS: usize = 10;

/// Order for a certificate for a set of identifiers.
#[derive(Debug, Clone)]
pub struct OrderContext {
    context: AcmeContext,
    location: Url,
}

impl OrderContext {
    pub(crate) fn new(context: AcmeContext, location: Url) -> Self {
        Self { context, location }
    }

    /// The URL identifying this order.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Fetch the order from the provider.
    pub async fn resource(&self) -> Result<schema::Order> {
        let response: Response<schema::Order> = self.context.fetch(&self.location).await?;
        Ok(response.into_inner())
    }

    /// The authorizations attached to this order.
    ///
    /// An order without an authorization list has no authorizations.
    pub async fn authorizations(&self) -> Result<Vec<AuthorizationContext>> {
        let order = self.resource().await?;
        Ok(order
            .authorizations()
            .iter()
            .map(|url| AuthorizationContext::new(self.context.clone(), url.clone()))
            .collect())
    }

    /// Submit a DER encoded certificate signing request for this order.
    ///
    /// This does not download the certificate itself, see [`OrderContext::download`]
    /// for that, or use [`OrderContext::generate`] to run the whole sequence.
    pub async fn finalize(&self, csr: &[u8]) -> Result<schema::Order> {
        let order = self.resource().await?;
        self.submit(&order, csr).await
    }

    /// Build, sign and submit a certificate signing request for this order.
    ///
    /// The requested names are the order's identifiers. Without a common name
    /// in `info`, the first identifier is used.
    pub async fn finalize_with(&self, mut info: CsrInfo, key: &SigningKey) -> Result<schema::Order> {
        let order = self.resource().await?;

        if info.common_name.is_none() {
            info.common_name = order.identifiers().first().map(|id| id.value().to_owned());
        }

        let mut csr = CertificateSigningRequest::new(info);
        for identifier in order.identifiers() {
            match identifier {
                Identifier::Dns { value } => csr.push(value.as_str()),
                Identifier::Ip { value } => {
                    let address: std::net::IpAddr = value
                        .parse()
                        .map_err(|_| AcmeError::MissingData("IP address identifier"))?;
                    csr.push(RequestedSubjectName::Ip(address));
                }
            }
        }

        tracing::trace!(names = csr.len(), "Signing certificate signing request");
        let signed = csr.sign(key)?;
        self.submit(&order, signed.as_der()).await
    }

    async fn submit(&self, order: &schema::Order, csr: &[u8]) -> Result<schema::Order> {
        let url = order
            .finalize()
            .ok_or(AcmeError::MissingData("finalize URL"))?;

        tracing::trace!("Sending order finalize request");
        let response: Response<schema::Order> =
            self.context.post(url, FinalizeOrder::new(csr)).await?;
        let order = response.into_inner();
        tracing::debug!(order = %self.location.as_str(), status = ?order.status(), "Finalized order");
        Ok(order)
    }

    /// Poll the order until it is ready, valid or invalid.
    ///
    /// Waits for the provider's `Retry-After` between polls, or one second if it
    /// sends none. After `max_polls` unsettled responses, returns
    /// [`AcmeError::NotReady`].
    pub async fn wait_until_settled(&self, max_polls: usize) -> Result<schema::Order> {
        for poll in 1..=max_polls {
            let response: Response<schema::Order> = self.context.fetch(&self.location).await?;
            let delay = response.retry_after().unwrap_or(DEFAULT_POLL_DELAY);
            let order = response.into_inner();

            if order.status().is_settled() {
                tracing::debug!(status = ?order.status(), "Order is settled");
                return Ok(order);
            }

            if poll < max_polls {
                tracing::trace!(status = ?order.status(), ?delay, poll, "Order is not settled");
                tokio::time::sleep(delay).await;
            }
        }

        Err(AcmeError::NotReady("order"))
    }

    /// Download the certificate chain for this order.
    ///
    /// With a `preferred_chain`, the default chain is returned when it already
    /// matches. Otherwise each alternate chain the provider links to is tried
    /// in order, falling back to the default when none match.
    pub async fn download(&self, preferred_chain: Option<&str>) -> Result<CertificateChain> {
        let order = self.resource().await?;
        let url = order
            .certificate()
            .ok_or(AcmeError::MissingData("certificate URL"))?;

        let response: Response<CertificateChain> = self.context.fetch(url).await?;
        let preferred = match preferred_chain {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(response.into_inner()),
        };

        if response.payload().matches_preferred_chain(preferred) {
            return Ok(response.into_inner());
        }

        let alternates: Vec<Url> = response.links().get(REL_ALTERNATE).cloned().collect();
        for alternate in alternates {
            tracing::trace!(url = %alternate.as_str(), "Fetching alternate chain");
            let chain: Response<CertificateChain> = self.context.fetch(&alternate).await?;
            if chain.payload().matches_preferred_chain(preferred) {
                tracing::debug!(url = %alternate.as_str(), preferred, "Using alternate chain");
                return Ok(chain.into_inner());
            }
        }

        tracing::debug!(preferred, "No chain matches, using the default chain");
        Ok(response.into_inner())
    }

    /// Finalize the order with a new request signed by `key`, wait for the
    /// provider to issue the certificate, and download it.
    pub async fn generate(
        &self,
        info: CsrInfo,
        key: Arc<SigningKey>,
        preferred_chain: Option<&str>,
    ) -> Result<CertificateInfo> {
        self.finalize_with(info, &key).await?;

        let order = self.wait_until_settled(DEFAULT_MAX_POLLS).await?;
        match order.status() {
            OrderStatus::Valid => {}
            OrderStatus::Invalid => {
                return Err(order
                    .error()
                    .cloned()
                    .map(AcmeError::Acme)
                    .unwrap_or(AcmeError::NotReady("order")))
            }
            _ => return Err(AcmeError::NotReady("certificate")),
        }

        let chain = self.download(preferred_chain).await?;
        Ok(CertificateInfo {
            chain,
            private_key: key,
        })
    }
}
