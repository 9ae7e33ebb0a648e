//! A high-level implementation of an ACME client
//!
//! Used for managing an account and issuing certificates. The usual flow
//! for a client is:
//!
//! 1. Build an [`AcmeContext`] for a provider and account key.
//! 2. Create or look up the account with [`AcmeContext::new_account`] or
//!    [`AcmeContext::account`].
//! 3. Create an order with [`AcmeContext::new_order`].
//! 4. For each identifier, complete a [`ChallengeContext`] attached to an
//!    [`AuthorizationContext`] on that order. Only one challenge per
//!    authorization is required.
//! 5. Finalize the order with a certificate signing request, using [`OrderContext::finalize`].
//! 6. Download the certificate with [`OrderContext::download`].
//!
//! Contexts only remember where their resource lives. Every call re-fetches
//! the resource from the provider; the directory and the account URL are
//! the only values kept for the lifetime of the [`AcmeContext`].

#![deny(unsafe_code)]
#![deny(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::key::{SignatureKind, SigningKey};
use crate::protocol::request::Key;
use crate::protocol::response::Decode;
use crate::protocol::transport::{HttpTransport, TransportBuilder};
use crate::protocol::{AcmeClient, AcmeError, Request, Response, Result, Url};
use crate::schema::account::CreateAccount;
use crate::schema::directory::{Directory, Endpoint};
use crate::schema::orders::NewOrderRequest;
use crate::schema::revocation::{CertificateRevocation, RevocationReason};
use crate::schema::{self, Identifier};

pub mod account;
pub mod authorization;
pub mod challenge;
pub mod order;
pub mod settings;

pub use self::account::{AccountContext, NewAccount, OrderListContext};
pub use self::authorization::AuthorizationContext;
pub use self::challenge::ChallengeContext;
pub use self::order::OrderContext;
pub use self::settings::AcmeSettings;

/// Included ACME provider information.
pub mod provider {

    /// The ACME directory URL for Let's Encrypt.
    pub const LETSENCRYPT: &str = "https://acme-v02.api.letsencrypt.org/directory";

    /// The ACME directory URL for the Let's Encrypt staging environment.
    pub const LETSENCRYPT_STAGING: &str =
        "https://acme-staging-v02.api.letsencrypt.org/directory";
}

#[derive(Debug)]
struct Engine {
    client: Arc<AcmeClient>,
    key: Arc<SigningKey>,
    account: OnceCell<Url>,
}

/// An ACME session: one provider, one account key.
///
/// Cloning is cheap, and clones share the nonce cache, the directory and the
/// account URL.
#[derive(Debug, Clone)]
pub struct AcmeContext {
    inner: Arc<Engine>,
}

impl AcmeContext {
    /// Get a builder for a new context.
    ///
    /// See [`AcmeContextBuilder`] for more information.
    pub fn builder() -> AcmeContextBuilder {
        AcmeContextBuilder::new()
    }

    /// A builder configured from the caller's settings: the default server,
    /// and the account key stored for it, if any.
    pub fn from_settings<S>(settings: &S) -> Result<AcmeContextBuilder>
    where
        S: AcmeSettings + ?Sized,
    {
        let server = settings.default_server();
        let key = settings.account_key_for(&server)?;
        let mut builder = AcmeContextBuilder::new().directory_url(server);
        if let Some(key) = key {
            builder = builder.account_key(Arc::new(key));
        }
        Ok(builder)
    }

    fn from_parts(client: Arc<AcmeClient>, key: Arc<SigningKey>, account: Option<Url>) -> Self {
        AcmeContext {
            inner: Arc::new(Engine {
                client,
                key,
                account: OnceCell::new_with(account),
            }),
        }
    }

    #[inline]
    pub(crate) fn client(&self) -> &AcmeClient {
        &self.inner.client
    }

    /// The provider's directory, fetched once per context.
    pub async fn directory(&self) -> Result<&Directory> {
        self.client().directory().await
    }

    /// The provider's current terms of service, if it publishes them.
    pub async fn terms_of_service(&self) -> Result<Option<Url>> {
        Ok(self.directory().await?.terms_of_service().cloned())
    }

    /// The key which identifies the account.
    pub fn account_key(&self) -> &Arc<SigningKey> {
        &self.inner.key
    }

    /// The account bound to this context's key.
    ///
    /// The account URL is looked up on first use.
    pub fn account(&self) -> AccountContext {
        AccountContext::new(self.clone())
    }

    /// Register a new account for this context's key.
    ///
    /// When the provider already knows the key, it returns the existing account.
    pub async fn new_account(&self, account: NewAccount) -> Result<AccountContext> {
        let url = self.directory().await?.endpoint(Endpoint::NewAccount)?.clone();

        let external_account_binding = account
            .external_account_binding
            .map(|binding| binding.token(self.account_key(), url.clone()))
            .transpose()?;

        let payload = CreateAccount {
            contact: account.contact,
            terms_of_service_agreed: account.terms_of_service_agreed.then_some(true),
            only_return_existing: None,
            external_account_binding,
        };

        let request = Request::post(payload, url, self.account_key().clone());
        let response: Response<schema::Account> = self.client().execute(&request).await?;
        let location = response
            .location()
            .ok_or(AcmeError::MissingData("account location"))?;

        tracing::debug!(account = %location.as_str(), status = ?response.status(), "Registered account");
        if self.inner.account.set(location.clone()).is_err() {
            tracing::trace!("Account location was already known");
        }
        Ok(AccountContext::new(self.clone()))
    }

    /// Place an order for a certificate covering `identifiers`.
    pub async fn new_order(
        &self,
        identifiers: Vec<Identifier>,
        not_before: Option<DateTime<Utc>>,
        not_after: Option<DateTime<Utc>>,
    ) -> Result<OrderContext> {
        let url = self.directory().await?.endpoint(Endpoint::NewOrder)?.clone();
        let payload = NewOrderRequest {
            identifiers,
            not_before,
            not_after,
        };

        let response: Response<schema::Order> = self.post(&url, payload).await?;
        let location = response
            .location()
            .ok_or(AcmeError::MissingData("order location"))?;
        tracing::debug!(order = %location.as_str(), "Created order");
        Ok(OrderContext::new(self.clone(), location))
    }

    /// An existing order at `location`.
    pub fn order(&self, location: Url) -> OrderContext {
        OrderContext::new(self.clone(), location)
    }

    /// An existing authorization at `location`.
    pub fn authorization(&self, location: Url) -> AuthorizationContext {
        AuthorizationContext::new(self.clone(), location)
    }

    /// Revoke a DER encoded certificate.
    ///
    /// Without `certificate_key` the request is signed by the account. With it,
    /// the request is signed by the certificate's own key, which the provider
    /// accepts without any account.
    pub async fn revoke_certificate(
        &self,
        certificate: &[u8],
        reason: Option<RevocationReason>,
        certificate_key: Option<Arc<SigningKey>>,
    ) -> Result<()> {
        let url = self.directory().await?.endpoint(Endpoint::RevokeCert)?.clone();
        let payload = CertificateRevocation::new(certificate, reason);

        let key = match certificate_key {
            Some(key) => Key::from(key),
            None => self.request_key().await?,
        };

        let _: Response<()> = self.client().execute(&Request::post(payload, url, key)).await?;
        tracing::debug!(?reason, "Revoked certificate");
        Ok(())
    }

    /// The account URL, looked up by key on first use.
    ///
    /// Concurrent callers share a single lookup.
    pub(crate) async fn account_location(&self) -> Result<&Url> {
        self.inner
            .account
            .get_or_try_init(|| self.discover_account())
            .await
    }

    async fn discover_account(&self) -> Result<Url> {
        let url = self.directory().await?.endpoint(Endpoint::NewAccount)?.clone();
        tracing::debug!(url = %url.as_str(), "Looking up account for key");

        let request = Request::post(
            CreateAccount::only_return_existing(),
            url,
            self.account_key().clone(),
        );
        let response: Response<schema::Account> = self.client().execute(&request).await?;
        let location = response
            .location()
            .ok_or(AcmeError::MissingData("account location"))?;

        tracing::debug!(account = %location.as_str(), "Found account");
        Ok(location)
    }

    pub(crate) async fn request_key(&self) -> Result<Key> {
        let location = self.account_location().await?.clone();
        Ok(Key::from((self.account_key().clone(), location)))
    }

    /// POST-as-GET `url` as the account, decoding the response.
    pub(crate) async fn fetch<R>(&self, url: &Url) -> Result<Response<R>>
    where
        R: Decode,
    {
        let request = Request::<()>::get(url.clone(), self.request_key().await?);
        self.client().execute(&request).await
    }

    /// POST `payload` to `url` as the account, decoding the response.
    pub(crate) async fn post<P, R>(&self, url: &Url, payload: P) -> Result<Response<R>>
    where
        P: Serialize,
        R: Decode,
    {
        let request = Request::post(payload, url.clone(), self.request_key().await?);
        self.client().execute(&request).await
    }

    /// A context for the same account, signing with `key`.
    pub(crate) fn rekeyed(&self, key: Arc<SigningKey>, account: Url) -> AcmeContext {
        AcmeContext::from_parts(self.inner.client.clone(), key, Some(account))
    }
}

/// Configure an [`AcmeContext`].
#[derive(Debug)]
pub struct AcmeContextBuilder {
    transport: TransportBuilder,
    custom_transport: Option<Arc<dyn HttpTransport>>,
    directory_url: Option<Url>,
    key: Option<Arc<SigningKey>>,
    account: Option<Url>,
    bad_nonce_retries: Option<usize>,
}

impl AcmeContextBuilder {
    fn new() -> Self {
        AcmeContextBuilder {
            transport: TransportBuilder::new(),
            custom_transport: None,
            directory_url: None,
            key: None,
            account: None,
            bad_nonce_retries: None,
        }
    }

    /// Set the directory URL of the ACME provider.
    pub fn directory_url(mut self, url: Url) -> Self {
        self.directory_url = Some(url);
        self
    }

    /// Set the account key. Without one, a new ES256 key is generated.
    pub fn account_key(mut self, key: Arc<SigningKey>) -> Self {
        self.key = Some(key);
        self
    }

    /// Set the account URL, when it is already known, skipping the lookup.
    pub fn account_location(mut self, url: Url) -> Self {
        self.account = Some(url);
        self
    }

    /// Explicitly add an additional root certificate to the underlying HTTP client.
    pub fn add_root_certificate(mut self, cert: reqwest::Certificate) -> Self {
        self.transport = self.transport.add_root_certificate(cert);
        self
    }

    /// Set a timeout for requests to complete.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.timeout(timeout);
        self
    }

    /// Set a timeout for requests to connect.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.connect_timeout(timeout);
        self
    }

    /// How many times to resend a request rejected for a bad nonce.
    pub fn bad_nonce_retries(mut self, retries: usize) -> Self {
        self.bad_nonce_retries = Some(retries);
        self
    }

    /// Send requests through `transport` instead of the default HTTPS client.
    ///
    /// Timeouts and root certificates configured on this builder do not apply
    /// to a custom transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.custom_transport = Some(transport);
        self
    }

    /// Build the context. No requests are sent until the context is used.
    pub fn build(self) -> Result<AcmeContext> {
        let url = self
            .directory_url
            .ok_or(AcmeError::MissingData("directory URL"))?;

        let transport: Arc<dyn HttpTransport> = match self.custom_transport {
            Some(transport) => transport,
            None => Arc::new(self.transport.build()?),
        };

        let mut client = AcmeClient::new(transport, url);
        if let Some(retries) = self.bad_nonce_retries {
            client = client.with_bad_nonce_retries(retries);
        }

        let key = match self.key {
            Some(key) => key,
            None => {
                tracing::debug!("Generating a new account key");
                Arc::new(SignatureKind::default().random()?)
            }
        };

        Ok(AcmeContext::from_parts(Arc::new(client), key, self.account))
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use super::*;
    use crate::protocol::transport::test::ScriptedTransport;

    pub(crate) const ACCOUNT: &str = "https://example.com/acme/acct/evOfKhNU60wg";

    /// A context whose account location is already known.
    pub(crate) fn context(transport: &Arc<ScriptedTransport>) -> AcmeContext {
        AcmeContext::builder()
            .directory_url("https://example.com/acme/directory".parse().unwrap())
            .account_key(crate::key!("ec-p256"))
            .account_location(ACCOUNT.parse().unwrap())
            .transport(transport.clone())
            .build()
            .unwrap()
    }

    /// A transport which has served the directory and a nonce.
    pub(crate) fn transport() -> Arc<ScriptedTransport> {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(crate::response!("directory.http"));
        transport.push(crate::response!("new-nonce.http"));
        transport
    }

    pub(crate) fn protected(request: &crate::protocol::transport::test::Recorded) -> serde_json::Value {
        use base64ct::Encoding;
        let body = request.json();
        let header = base64ct::Base64UrlUnpadded::decode_vec(body["protected"].as_str().unwrap()).unwrap();
        serde_json::from_slice(&header).unwrap()
    }

    pub(crate) fn payload(request: &crate::protocol::transport::test::Recorded) -> serde_json::Value {
        use base64ct::Encoding;
        let body = request.json();
        let payload = base64ct::Base64UrlUnpadded::decode_vec(body["payload"].as_str().unwrap()).unwrap();
        if payload.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&payload).unwrap()
        }
    }

    #[test]
    fn context_is_send_and_sync() {
        static_assertions::assert_impl_all!(AcmeContext: Send, Sync, Clone);
    }

    #[test]
    fn directory_url_is_required() {
        let result = AcmeContext::builder().build();
        assert!(matches!(result, Err(AcmeError::MissingData("directory URL"))));
    }

    #[tokio::test]
    async fn account_discovery_runs_once() {
        let transport = transport();
        transport.push(crate::response!("existing-account.http"));
        let context = AcmeContext::builder()
            .directory_url("https://example.com/acme/directory".parse().unwrap())
            .account_key(crate::key!("ec-p256"))
            .transport(transport.clone())
            .build()
            .unwrap();

        let (first, second) = tokio::join!(context.account_location(), context.account_location());
        assert_eq!(first.unwrap().as_str(), ACCOUNT);
        assert_eq!(second.unwrap().as_str(), ACCOUNT);

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2].url, "https://example.com/acme/new-account");

        let header = protected(&requests[2]);
        assert!(header.get("jwk").is_some());
        assert!(header.get("kid").is_none());
        assert_eq!(payload(&requests[2]), serde_json::json!({"onlyReturnExisting": true}));
    }

    #[tokio::test]
    async fn missing_account_is_not_memoized() {
        let transport = transport();
        transport.push(crate::response!("account-missing.http"));
        transport.push(crate::response!("existing-account.http"));
        let context = AcmeContext::builder()
            .directory_url("https://example.com/acme/directory".parse().unwrap())
            .account_key(crate::key!("ec-p256"))
            .transport(transport.clone())
            .build()
            .unwrap();

        let error = context.account_location().await.unwrap_err();
        assert_eq!(
            error.document().unwrap().kind(),
            &crate::protocol::errors::AcmeErrorCode::AccountDoesNotExist
        );

        assert_eq!(context.account_location().await.unwrap().as_str(), ACCOUNT);
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test]
    async fn new_account_memoizes_location() {
        let transport = transport();
        transport.push(crate::response!("new-account.http"));
        transport.push(crate::response!("new-order.http"));
        let context = AcmeContext::builder()
            .directory_url("https://example.com/acme/directory".parse().unwrap())
            .account_key(crate::key!("ec-p256"))
            .transport(transport.clone())
            .build()
            .unwrap();

        let account = NewAccount::new()
            .add_contact_email("cert-admin@example.org")
            .unwrap()
            .agree_to_terms_of_service();
        context.new_account(account).await.unwrap();

        let order = context
            .new_order(vec![Identifier::dns("www.example.org")], None, None)
            .await
            .unwrap();
        assert_eq!(order.location().as_str(), "https://example.com/acme/order/TOlocE8rfgo");

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(
            payload(&requests[2]),
            serde_json::json!({
                "contact": ["mailto:cert-admin@example.org"],
                "termsOfServiceAgreed": true
            })
        );
        // No lookup: the order is signed with the registered account's URL.
        let header = protected(&requests[3]);
        assert_eq!(header["kid"], ACCOUNT);
        assert_eq!(header["url"], "https://example.com/acme/new-order");
    }

    #[tokio::test]
    async fn terms_of_service_from_directory() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(crate::response!("directory.http"));
        let context = context(&transport);
        assert_eq!(
            context.terms_of_service().await.unwrap().unwrap().as_str(),
            "https://example.com/acme/terms/2017-5-30"
        );
    }

    #[tokio::test]
    async fn missing_endpoint_is_unsupported() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(crate::response!("directory-minimal.http"));
        let context = context(&transport);

        let result = context.revoke_certificate(&[0x30], None, None).await;
        assert!(matches!(result, Err(AcmeError::Unsupported("revoke-cert"))));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn revoke_with_certificate_key() {
        let transport = transport();
        transport.push(crate::response!("revoked.http"));
        let context = context(&transport);

        context
            .revoke_certificate(
                &[0x30, 0x82, 0xff],
                Some(RevocationReason::Superseded),
                Some(crate::key!("ec-p384")),
            )
            .await
            .unwrap();

        let requests = transport.requests();
        let header = protected(&requests[2]);
        assert_eq!(header["alg"], "ES384");
        assert!(header.get("jwk").is_some());
        assert_eq!(
            payload(&requests[2]),
            serde_json::json!({"certificate": "MIL_", "reason": 4})
        );
    }
}
