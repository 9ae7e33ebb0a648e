//! Caller-provided configuration.
//!
//! Where settings live, and in what format, is up to the application. The
//! engine only asks two questions of them.

use crate::key::SigningKey;
use crate::protocol::{Result, Url};

/// Persisted settings for choosing a provider and an account key.
pub trait AcmeSettings {
    /// The directory URL of the provider to use when none is given.
    fn default_server(&self) -> Url;

    /// The account key stored for `server`, if one exists.
    ///
    /// Keys are usually read with [`SigningKey::load`].
    fn account_key_for(&self, server: &Url) -> Result<Option<SigningKey>>;
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;
    use crate::key::KeyReader;
    use crate::service::provider::LETSENCRYPT_STAGING;
    use crate::service::AcmeContext;

    struct Files(HashMap<&'static str, &'static str>);

    impl KeyReader for Files {
        fn read(&self, path: &str) -> std::io::Result<String> {
            self.0
                .get(path)
                .map(|pem| pem.to_string())
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }
    }

    struct Settings {
        files: Files,
    }

    impl AcmeSettings for Settings {
        fn default_server(&self) -> Url {
            LETSENCRYPT_STAGING.parse().unwrap()
        }

        fn account_key_for(&self, server: &Url) -> Result<Option<SigningKey>> {
            let path = format!("{}/account.pem", server.host().unwrap_or_default());
            match SigningKey::load(&self.files, &path) {
                Ok(key) => Ok(Some(key)),
                Err(crate::protocol::AcmeError::KeyRead { .. }) => Ok(None),
                Err(error) => Err(error),
            }
        }
    }

    #[test]
    fn context_from_settings() {
        let settings = Settings {
            files: Files(HashMap::from([(
                "acme-staging-v02.api.letsencrypt.org/account.pem",
                include_str!("../../reference-keys/ec-p384.pem"),
            )])),
        };

        let context = AcmeContext::from_settings(&settings).unwrap().build().unwrap();
        assert_eq!(context.account_key().as_ref(), crate::key!("ec-p384").as_ref());
        assert_eq!(context.client().directory_url().as_str(), LETSENCRYPT_STAGING);
    }

    #[test]
    fn missing_key_is_generated() {
        let settings = Settings {
            files: Files(HashMap::new()),
        };
        let context = AcmeContext::from_settings(&settings).unwrap().build().unwrap();
        assert_eq!(context.account_key().kind(), crate::key::SignatureKind::default());
    }
}
