use std::{collections::HashMap, hash::Hash};

use model::token::{RequestToken, TokenSource};
use tokio_util::sync::CancellationToken;

struct InFlight<P> {
    token: RequestToken,
    cancel: CancellationToken,
    payload: P,
}

/// Bookkeeping for "at most one request per key". Issuing a request for a
/// key cancels the one before it; a response is current only while its
/// token is still the recorded one.
pub struct InFlightRegistry<K, P = ()> {
    tokens: TokenSource,
    entries: HashMap<K, InFlight<P>>,
}

impl<K, P> Default for InFlightRegistry<K, P> {
    fn default() -> Self {
        Self {
            tokens: TokenSource::new(),
            entries: HashMap::new(),
        }
    }
}

impl<K, P> InFlightRegistry<K, P>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, key: K, payload: P) -> (RequestToken, CancellationToken) {
        let token = self.tokens.issue();
        let cancel = CancellationToken::new();
        let previous = self.entries.insert(
            key,
            InFlight {
                token,
                cancel: cancel.clone(),
                payload,
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        (token, cancel)
    }

    /// Removes the entry if `token` is still current. `false` means the
    /// response is stale and must be dropped.
    pub fn complete(&mut self, key: &K, token: RequestToken) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.token == token => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.cancel.cancel();
        }
        count
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn current(&self, key: &K) -> Option<RequestToken> {
        self.entries.get(key).map(|entry| entry.token)
    }

    pub fn payload(&self, key: &K) -> Option<&P> {
        self.entries.get(key).map(|entry| &entry.payload)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_request_supersedes_older() {
        let mut registry: InFlightRegistry<&str> = InFlightRegistry::new();
        let (first, first_cancel) = registry.issue("a", ());
        let (second, second_cancel) = registry.issue("a", ());

        assert!(first_cancel.is_cancelled());
        assert!(!second_cancel.is_cancelled());
        assert!(!registry.complete(&"a", first));
        assert!(registry.complete(&"a", second));
        assert!(!registry.is_in_flight(&"a"));
    }

    #[test]
    fn keys_are_independent() {
        let mut registry: InFlightRegistry<&str> = InFlightRegistry::new();
        let (a, _) = registry.issue("a", ());
        let (b, b_cancel) = registry.issue("b", ());
        assert!(!b_cancel.is_cancelled());
        assert!(registry.complete(&"a", a));
        assert!(registry.complete(&"b", b));
    }

    #[test]
    fn cancel_all_invalidates_everything() {
        let mut registry: InFlightRegistry<&str> = InFlightRegistry::new();
        let (a, a_cancel) = registry.issue("a", ());
        let (_, b_cancel) = registry.issue("b", ());
        assert_eq!(registry.cancel_all(), 2);
        assert!(a_cancel.is_cancelled() && b_cancel.is_cancelled());
        assert!(!registry.complete(&"a", a));
        assert!(registry.is_empty());
    }
}
