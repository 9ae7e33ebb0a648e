//! An ACME service provider account
//!
//! Accounts are identified by their signing key, and addressed by the URL the
//! provider assigns them when they are created.

use std::collections::HashSet;
use std::sync::Arc;

use crate::key::SigningKey;
use crate::protocol::links::REL_NEXT;
use crate::protocol::{AcmeError, Response, Result, Url};
use crate::schema::account::{
    Contacts, ExternalAccountBindingRequest, KeyChange, UpdateAccount,
};
use crate::schema::directory::Endpoint;
use crate::schema::orders::Orders;
use crate::schema::{self, Deactivate};

use super::{AcmeContext, OrderContext};

/// Manage a request for a new ACME account.
///
/// Pass the request to [`AcmeContext::new_account`].
#[derive(Debug, Default)]
pub struct NewAccount {
    pub(crate) contact: Contacts,
    pub(crate) terms_of_service_agreed: bool,
    pub(crate) external_account_binding: Option<ExternalAccountBindingRequest>,
}

impl NewAccount {
    /// An account request with no contacts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an email address as a contact for this account.
    pub fn add_contact_email(mut self, email: &str) -> std::result::Result<Self, url::ParseError> {
        self.contact.add_contact_email(email)?;
        Ok(self)
    }

    /// Add a URL as a contact for this account.
    pub fn add_contact_url(mut self, url: Url) -> Self {
        self.contact.add_contact_url(url);
        self
    }

    /// Tell the provider that the user has taken action to agree to the terms of service.
    pub fn agree_to_terms_of_service(mut self) -> Self {
        self.terms_of_service_agreed = true;
        self
    }

    /// Bind this ACME account to an external account with some identifier.
    ///
    /// This allows accounts created with an ACME provider via their website to be linked
    /// to the automated accounts created during the ACME protocol.
    pub fn external_account(mut self, binding: ExternalAccountBindingRequest) -> Self {
        self.external_account_binding = Some(binding);
        self
    }
}

/// The account bound to an [`AcmeContext`]'s key.
#[derive(Debug, Clone)]
pub struct AccountContext {
    context: AcmeContext,
}

impl AccountContext {
    pub(crate) fn new(context: AcmeContext) -> Self {
        Self { context }
    }

    /// Identifying URL for this account, looked up on first use.
    pub async fn location(&self) -> Result<Url> {
        Ok(self.context.account_location().await?.clone())
    }

    /// Fetch the account from the provider.
    pub async fn resource(&self) -> Result<schema::Account> {
        let location = self.location().await?;
        let response: Response<schema::Account> = self.context.fetch(&location).await?;
        Ok(response.into_inner())
    }

    /// Replace the account's contacts, or record agreement to the terms of service.
    ///
    /// Fields left as `None` (or `false`) are not sent.
    pub async fn update(
        &self,
        contact: Option<Contacts>,
        agree_to_terms_of_service: bool,
    ) -> Result<schema::Account> {
        let location = self.location().await?;
        let payload = UpdateAccount::new(contact, agree_to_terms_of_service.then_some(true));
        let response: Response<schema::Account> = self.context.post(&location, payload).await?;
        tracing::debug!(account = %location.as_str(), "Updated account");
        Ok(response.into_inner())
    }

    /// Deactivate the account. The provider will refuse any further requests for it.
    pub async fn deactivate(&self) -> Result<schema::Account> {
        let location = self.location().await?;
        let response: Response<schema::Account> =
            self.context.post(&location, Deactivate::default()).await?;
        tracing::debug!(account = %location.as_str(), "Deactivated account");
        Ok(response.into_inner())
    }

    /// The list of orders placed by this account.
    pub async fn orders(&self) -> Result<OrderListContext> {
        let location = self
            .resource()
            .await?
            .orders
            .ok_or(AcmeError::MissingData("orders URL"))?;
        Ok(OrderListContext {
            context: self.context.clone(),
            location,
        })
    }

    /// Replace the key which identifies this account.
    ///
    /// The returned context signs with `new_key`. This context, and its clones,
    /// keep using the old key, which the provider no longer accepts.
    pub async fn change_key(&self, new_key: Arc<SigningKey>) -> Result<AcmeContext> {
        let url = self
            .context
            .directory()
            .await?
            .endpoint(Endpoint::KeyChange)?
            .clone();
        let location = self.location().await?;

        let rollover =
            KeyChange::new(location.clone(), self.context.account_key()).sign(&new_key, url.clone())?;
        let _: Response<schema::Account> = self.context.post(&url, rollover).await?;
        tracing::debug!(account = %location.as_str(), "Changed account key");

        Ok(self.context.rekeyed(new_key, location))
    }
}

/// The orders collection of an account.
#[derive(Debug, Clone)]
pub struct OrderListContext {
    context: AcmeContext,
    location: Url,
}

impl OrderListContext {
    /// URL of the first page of orders.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Every order in the collection, following `next` links across pages.
    pub async fn orders(&self) -> Result<Vec<OrderContext>> {
        let mut orders = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(self.location.clone());

        while let Some(url) = next.take() {
            if !seen.insert(url.clone()) {
                tracing::warn!(url = %url.as_str(), "Order pages link back to a visited page");
                break;
            }

            tracing::debug!(page = seen.len(), "Fetching orders");
            let response: Response<Orders> = self.context.fetch(&url).await?;
            next = response.links().first(REL_NEXT).cloned();

            orders.extend(
                response
                    .into_inner()
                    .orders
                    .into_iter()
                    .map(|location| OrderContext::new(self.context.clone(), location)),
            );
        }

        Ok(orders)
    }
}
