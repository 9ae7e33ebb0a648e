//! Account payloads and resources.
//!
//! An ACME account is named by a URL and authenticated by its key. Providers
//! which require it can tie the account to an existing customer record with an
//! external account binding.

use std::collections::HashSet;

use serde::{ser, Deserialize, Serialize};

use crate::key::jwk::Jwk;
use crate::key::SigningKey;
use crate::protocol::jose::{ProtectedHeader, SignedToken, UnsignedToken};
use crate::protocol::{AcmeError, Url};

pub mod external {
    //! External account binding (RFC 8555 section 7.3.4).

    use base64ct::Encoding;
    use hmac::Mac;
    use serde::{Deserialize, Serialize};

    use crate::key::jwk::Jwk;
    use crate::key::SigningKey;
    use crate::protocol::jose::{ProtectedHeader, SignatureAlgorithm, SignedToken, UnsignedToken};
    use crate::protocol::{AcmeError, Base64Data, Url};

    /// Shared MAC key issued by the provider for external account binding.
    ///
    /// `Debug` output never includes the key material.
    #[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(from = "Base64Data<Key>", into = "Base64Data<Key>")]
    pub struct Key(Vec<u8>);

    impl Key {
        /// Decode a key from the base64url text handed out by the provider.
        pub fn from_base64(encoded: &str) -> Result<Self, AcmeError> {
            base64ct::Base64UrlUnpadded::decode_vec(encoded.trim_end_matches('='))
                .map(Key)
                .map_err(|_| AcmeError::UnsupportedKey("external account key is not base64url".into()))
        }
    }

    impl std::fmt::Debug for Key {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_tuple("Key").field(&"<redacted>").finish()
        }
    }

    impl AsRef<[u8]> for Key {
        fn as_ref(&self) -> &[u8] {
            self.0.as_slice()
        }
    }

    impl From<Base64Data<Key>> for Key {
        fn from(value: Base64Data<Key>) -> Self {
            value.0
        }
    }

    impl From<Vec<u8>> for Key {
        fn from(value: Vec<u8>) -> Self {
            Key(value)
        }
    }

    impl From<&[u8]> for Key {
        fn from(value: &[u8]) -> Self {
            Key(value.into())
        }
    }

    /// The provider's key identifier for a binding, sent as `kid`.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ExternalAccountId(String);

    impl From<String> for ExternalAccountId {
        fn from(value: String) -> Self {
            ExternalAccountId(value)
        }
    }

    impl From<&str> for ExternalAccountId {
        fn from(value: &str) -> Self {
            ExternalAccountId(value.into())
        }
    }

    /// HS256 token carried in `externalAccountBinding` of a new account request.
    #[derive(Debug, Serialize)]
    pub struct ExternalAccountToken(SignedToken<Jwk, ExternalAccountId>);

    impl ExternalAccountToken {
        /// The signed token.
        pub fn token(&self) -> &SignedToken<Jwk, ExternalAccountId> {
            &self.0
        }
    }

    type HmacSha256 = hmac::Hmac<sha2::Sha256>;

    /// Key id and MAC key pair as handed out by a provider.
    ///
    /// Nothing is sent as-is; [`ExternalAccountBindingRequest::token`] produces
    /// the signed value.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ExternalAccountBindingRequest {
        /// Sent as the `kid` of the binding token.
        pub id: ExternalAccountId,
        /// HMAC key for the binding token.
        pub key: Key,
    }

    impl ExternalAccountBindingRequest {
        /// Pair a key id with its MAC key.
        pub fn new(id: ExternalAccountId, key: Key) -> Self {
            Self { id, key }
        }

        /// MAC the account's public JWK with the provider key.
        ///
        /// `url` must be the `newAccount` URL the token will be posted to.
        pub fn token(&self, account_key: &SigningKey, url: Url) -> Result<ExternalAccountToken, AcmeError> {
            let token = UnsignedToken::post(
                ProtectedHeader::new(
                    SignatureAlgorithm::HS256,
                    Some(self.id.clone()),
                    None,
                    url,
                    None,
                ),
                account_key.as_jwk(),
            );

            let mac = HmacSha256::new_from_slice(self.key.as_ref())
                .map_err(|_| AcmeError::UnsupportedKey("external account key".into()))?;

            Ok(ExternalAccountToken(token.digest(mac)?))
        }
    }

    #[cfg(test)]
    mod test {
        use super::*;

        fn request() -> ExternalAccountBindingRequest {
            let key = Key::from(&b"12345678901234567890123456789012"[..]);
            let id = ExternalAccountId::from("kid-1");
            ExternalAccountBindingRequest { id, key }
        }

        #[test]
        fn serde_external_account_binding() {
            let request = request();
            let serialized = serde_json::to_string(&request).unwrap();
            assert!(serialized.contains("MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI"));
            let deserialized: ExternalAccountBindingRequest =
                serde_json::from_str(&serialized).unwrap();
            assert_eq!(request, deserialized);
        }

        #[test]
        fn external_account_token() {
            let account_key = crate::key!("ec-p256");
            let url: Url = "https://example.com/acme/new-account".parse().unwrap();
            let token = request().token(&account_key, url).unwrap();
            let serialized = serde_json::to_value(&token).unwrap();

            let protected = base64ct::Base64UrlUnpadded::decode_vec(
                serialized["protected"].as_str().unwrap(),
            )
            .unwrap();
            let protected: serde_json::Value = serde_json::from_slice(&protected).unwrap();
            assert_eq!(protected["alg"], "HS256");
            assert_eq!(protected["kid"], "kid-1");
            assert!(protected.get("nonce").is_none());
            assert!(protected.get("jwk").is_none());

            let payload =
                base64ct::Base64UrlUnpadded::decode_vec(serialized["payload"].as_str().unwrap())
                    .unwrap();
            assert_eq!(payload, serde_json::to_vec(&account_key.as_jwk()).unwrap());

            // HMAC-SHA256 output
            assert_eq!(token.token().signature().len(), 32);
        }

        #[test]
        fn key_from_provider_text() {
            let key = Key::from_base64("MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI").unwrap();
            assert_eq!(key, request().key);
            assert!(Key::from_base64("not base64!").is_err());
        }
    }
}

pub use external::*;

/// Contact URLs for an account.
///
/// Duplicates collapse, and the set serializes in sorted order.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct Contacts(HashSet<Url>);

impl Contacts {
    /// No contacts.
    pub fn new() -> Self {
        Default::default()
    }

    /// Insert any contact URL, e.g. `tel:`.
    pub fn add_contact_url(&mut self, url: Url) {
        self.0.insert(url);
    }

    /// Insert `mailto:{email}`.
    pub fn add_contact_email(&mut self, email: &str) -> Result<(), url::ParseError> {
        let url: Url = format!("mailto:{email}").parse()?;
        self.add_contact_url(url);
        Ok(())
    }

    /// Remove every contact.
    pub fn clear(&mut self) {
        self.0.clear()
    }

    /// Returns `true` if `url` was present.
    pub fn remove(&mut self, url: &Url) -> bool {
        self.0.remove(url)
    }

    /// Number of distinct contacts.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Empty sets are left out of new account requests.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Contacts in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.0.iter()
    }
}

impl FromIterator<Url> for Contacts {
    fn from_iter<I: IntoIterator<Item = Url>>(iter: I) -> Self {
        Contacts(iter.into_iter().collect())
    }
}

impl ser::Serialize for Contacts {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut contacts = self.0.iter().map(|s| s.as_str()).collect::<Vec<_>>();
        contacts.sort_unstable();
        let mut seq = serializer.serialize_seq(Some(contacts.len()))?;
        for contact in contacts {
            seq.serialize_element(contact)?;
        }
        seq.end()
    }
}

/// An account resource as returned by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Current state.
    pub status: AccountStatus,

    /// Contact URLs on file.
    #[serde(default)]
    pub contact: Contacts,

    /// Providers only echo this when it was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_of_service_agreed: Option<bool>,

    /// First page of the account's order list.
    #[serde(default)]
    pub orders: Option<Url>,
}

/// Account lifecycle.
///
/// New accounts start out `valid`. `pending` is not in RFC 8555 but is
/// reported by some providers while an out-of-band step is outstanding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// The account exists but is not yet usable.
    Pending,

    /// Usable for orders.
    Valid,
    /// Deactivated by its owner. This cannot be undone.
    Deactivated,
    /// Revoked by the provider.
    Revoked,
}

/// Payload for the `newAccount` endpoint.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccount {
    /// Omitted when empty.
    #[serde(skip_serializing_if = "Contacts::is_empty")]
    pub contact: Contacts,

    /// Only set this when the person behind the account accepted the terms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service_agreed: Option<bool>,

    /// Look the key up instead of registering it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_return_existing: Option<bool>,

    /// Required by providers with `externalAccountRequired` set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_account_binding: Option<ExternalAccountToken>,
}

impl CreateAccount {
    /// The payload which looks up the account for a key without creating one.
    pub fn only_return_existing() -> Self {
        CreateAccount {
            only_return_existing: Some(true),
            ..Default::default()
        }
    }
}

/// Payload for posting to an account URL.
///
/// Fields left as `None` are not sent, and keep their current value.
#[derive(Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccount {
    /// Replace the list of contacts on this account.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contacts>,

    /// Agree to the current terms of service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service_agreed: Option<bool>,
}

impl UpdateAccount {
    /// `None` leaves the field unchanged.
    pub fn new(contact: Option<Contacts>, terms_of_service_agreed: Option<bool>) -> Self {
        Self {
            contact,
            terms_of_service_agreed,
        }
    }
}

/// Inner payload of an account key rollover.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyChange {
    /// The account being re-keyed.
    pub account: Url,
    /// The key currently bound to the account.
    pub old_key: Jwk,
}

/// A [`KeyChange`] signed by the replacement key, carried as the payload of
/// the request to the `keyChange` endpoint.
///
/// The inner token embeds the new key as a JWK and carries no nonce.
#[derive(Debug, Serialize)]
pub struct KeyRollover(SignedToken<KeyChange, Url>);

impl KeyChange {
    /// Describe replacing `old_key` on `account`.
    pub fn new(account: Url, old_key: &SigningKey) -> Self {
        KeyChange {
            account,
            old_key: old_key.as_jwk(),
        }
    }

    /// Sign this payload with `new_key` for delivery to `url`.
    pub fn sign(self, new_key: &SigningKey, url: Url) -> Result<KeyRollover, AcmeError> {
        let header = ProtectedHeader::new(
            new_key.jws_algorithm(),
            None,
            Some(new_key.as_jwk()),
            url,
            None,
        );
        Ok(KeyRollover(UnsignedToken::post(header, self).sign(new_key)?))
    }
}

#[cfg(test)]
mod test {
    use base64ct::Encoding;

    use crate::protocol::jose::{AcmeProtectedHeader, Nonce};

    use super::*;

    fn segment(value: &serde_json::Value) -> serde_json::Value {
        let bytes = base64ct::Base64UrlUnpadded::decode_vec(value.as_str().unwrap()).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn deserialize_account() {
        let response = crate::response!("account.http");
        let account: Account = serde_json::from_str(response.body()).unwrap();

        assert_eq!(account.status, AccountStatus::Valid);
        assert_eq!(account.contact.len(), 2);
        assert_eq!(account.terms_of_service_agreed, Some(true));
        assert_eq!(
            account.orders,
            "https://example.com/acme/acct/evOfKhNU60wg/orders".parse().ok()
        );
    }

    #[test]
    fn deserialize_account_le_style() {
        let account: Account = serde_json::from_str(r#"{"status": "valid"}"#).unwrap();

        assert_eq!(account.status, AccountStatus::Valid);
        assert!(account.contact.is_empty());
        assert_eq!(account.orders, None);
    }

    #[test]
    fn new_account_request() {
        let key = crate::key!("ec-p256");
        let mut contacts = Contacts::new();
        contacts.add_contact_email("cert-admin@example.org").unwrap();
        contacts.add_contact_email("admin@example.org").unwrap();

        let header = AcmeProtectedHeader::new_acme_header(
            &key,
            "https://example.com/acme/new-account".parse().unwrap(),
            Some(Nonce::from("6S8IqOGY7eL2lsGoTZYifg")),
        );

        let payload = CreateAccount {
            contact: contacts,
            terms_of_service_agreed: Some(true),
            ..Default::default()
        };

        let signed_token = UnsignedToken::post(header, &payload).sign(key.as_ref()).unwrap();
        let serialized = serde_json::to_value(signed_token).unwrap();

        assert_eq!(
            segment(&serialized["payload"]),
            serde_json::json!({
                "contact": ["mailto:admin@example.org", "mailto:cert-admin@example.org"],
                "termsOfServiceAgreed": true,
            })
        );
        let protected = segment(&serialized["protected"]);
        assert_eq!(protected["nonce"], "6S8IqOGY7eL2lsGoTZYifg");
        assert_eq!(protected["jwk"], serde_json::to_value(key.as_jwk()).unwrap());
    }

    #[test]
    fn probe_and_update_payloads() {
        assert_eq!(
            serde_json::to_value(CreateAccount::only_return_existing()).unwrap(),
            serde_json::json!({"onlyReturnExisting": true})
        );
        assert_eq!(
            serde_json::to_value(UpdateAccount::new(None, Some(true))).unwrap(),
            serde_json::json!({"termsOfServiceAgreed": true})
        );
    }

    #[test]
    fn key_rollover_inner_token() {
        let old = crate::key!("ec-p256");
        let new = crate::key!("ec-p384");
        let account: Url = "https://example.com/acme/acct/evOfKhNU60wg".parse().unwrap();
        let rollover = KeyChange::new(account, &old)
            .sign(&new, "https://example.com/acme/key-change".parse().unwrap())
            .unwrap();

        let value = serde_json::to_value(&rollover).unwrap();
        let protected = segment(&value["protected"]);
        assert_eq!(protected["alg"], "ES384");
        assert_eq!(protected["url"], "https://example.com/acme/key-change");
        assert_eq!(protected["jwk"], serde_json::to_value(new.as_jwk()).unwrap());
        assert!(protected.get("nonce").is_none());

        let payload = segment(&value["payload"]);
        assert_eq!(payload["account"], "https://example.com/acme/acct/evOfKhNU60wg");
        assert_eq!(payload["oldKey"], serde_json::to_value(old.as_jwk()).unwrap());
    }
}
