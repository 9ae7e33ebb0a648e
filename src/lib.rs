//! # ACME Engine
//!
//! An asynchronous client engine for the [ACME protocol](https://tools.ietf.org/html/rfc8555),
//! used to register accounts and obtain certificates from providers such as Let's Encrypt.
//!
//! ## Features
//!
//! Accounts can be created, looked up by key, updated, deactivated and re-keyed. Orders
//! are placed for DNS and IP identifiers, and authorized with HTTP-01, DNS-01 or
//! TLS-ALPN-01 challenges. Issued certificates can be downloaded with a preferred chain,
//! bundled as PEM or PKCS#12, and revoked.
//!
//! Account and certificate keys may be ECDSA (P-256, P-384, P-521) or RSA.
//!
//! ## Usage
//!
//! The engine is split into several levels of api:
//!
//! - `service` is the high level API, starting from an [`service::AcmeContext`].
//! - `schema` provides all of the data structures to implement individual ACME endpoints.
//! - `protocol` provides the signed request protocol used by ACME servers, and the transport.
//! - `key` provides the account and certificate keys.
//! - `cert` builds certificate signing requests and reads issued certificate chains.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use acme_engine::cert::CsrInfo;
//! # use acme_engine::key::SignatureKind;
//! # use acme_engine::schema::Identifier;
//! # use acme_engine::service::{provider, AcmeContext, NewAccount};
//! # async fn issue() -> Result<(), acme_engine::protocol::AcmeError> {
//! let context = AcmeContext::builder()
//!     .directory_url(provider::LETSENCRYPT_STAGING.parse().unwrap())
//!     .build()?;
//!
//! context
//!     .new_account(NewAccount::new().agree_to_terms_of_service())
//!     .await?;
//!
//! let order = context
//!     .new_order(vec![Identifier::dns("www.example.org")], None, None)
//!     .await?;
//!
//! for authorization in order.authorizations().await? {
//!     let challenge = authorization.http().await?;
//!     // Serve challenge.key_authorization()? before continuing.
//!     challenge.validate().await?;
//! }
//!
//! let key = Arc::new(SignatureKind::default().random()?);
//! let certificate = order.generate(CsrInfo::default(), key, None).await?;
//! println!("{}", certificate.to_pem()?);
//! # Ok(())
//! # }
//! ```

pub mod cert;
pub mod key;
pub mod protocol;
pub mod schema;
pub mod service;
