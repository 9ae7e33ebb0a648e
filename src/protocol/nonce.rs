//! Single-slot storage for anti-replay nonces.

use std::sync::{Mutex, PoisonError};

use http::HeaderMap;

use super::jose::Nonce;
use super::AcmeError;

/// The response header carrying a fresh nonce.
pub const NONCE_HEADER: &str = "Replay-Nonce";

/// Holds at most one unused [`Nonce`].
///
/// Every response from the ACME provider refills the slot, and every signed
/// request empties it. [`NonceCache::take`] swaps the slot out under a lock,
/// so concurrent requests sharing one cache never receive the same nonce.
/// The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct NonceCache {
    slot: Mutex<Option<Nonce>>,
}

impl NonceCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the cached nonce, leaving the slot empty.
    pub fn take(&self) -> Option<Nonce> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Store a nonce, replacing any unused one.
    pub fn store(&self, nonce: Nonce) {
        let previous = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(nonce);
        if previous.is_some() {
            tracing::trace!("Discarding unused nonce");
        }
    }
}

/// Read the `Replay-Nonce` header. When the header is repeated, the last
/// value wins.
pub(crate) fn extract_nonce(headers: &HeaderMap) -> Result<Nonce, AcmeError> {
    let value = headers
        .get_all(NONCE_HEADER)
        .iter()
        .last()
        .ok_or(AcmeError::MissingNonce)?;
    Ok(Nonce::from(
        value
            .to_str()
            .map_err(|_| AcmeError::InvalidNonce(Some(value.clone())))?
            .to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn extract_nonce_from_header() {
        let response = crate::response!("new-nonce.http");
        let nonce = extract_nonce(response.headers()).unwrap();
        assert_eq!(nonce.as_ref(), "oFvnlFP1wIhRlYS2jTaXbA");
    }

    #[test]
    fn last_nonce_header_wins() {
        let mut headers = HeaderMap::new();
        headers.append(NONCE_HEADER, "first".parse().unwrap());
        headers.append(NONCE_HEADER, "second".parse().unwrap());
        assert_eq!(extract_nonce(&headers).unwrap().as_ref(), "second");

        assert!(matches!(
            extract_nonce(&HeaderMap::new()),
            Err(AcmeError::MissingNonce)
        ));
    }

    #[test]
    fn take_clears_slot() {
        let cache = NonceCache::new();
        assert!(cache.take().is_none());

        cache.store("a".into());
        cache.store("b".into());
        assert_eq!(cache.take().unwrap().as_ref(), "b");
        assert!(cache.take().is_none());
    }

    #[test]
    fn concurrent_takes_never_share_a_nonce() {
        let cache = Arc::new(NonceCache::new());
        cache.store("only".into());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.take())
            })
            .collect();

        let taken = handles
            .into_iter()
            .filter_map(|handle| handle.join().unwrap())
            .count();
        assert_eq!(taken, 1);
    }

    static_assertions::assert_impl_all!(NonceCache: Send, Sync);
}
