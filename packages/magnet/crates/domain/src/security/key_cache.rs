use crate::ports::key_provider::{KeyFetchError, KeyProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Process-lifetime key cache in front of a [`KeyProvider`].
///
/// Append-only: a username is fetched at most once successfully and never
/// evicted. Failed fetches are not cached, so a later attempt retries.
pub struct KeyCache {
    inner: Arc<dyn KeyProvider>,
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl KeyCache {
    pub fn new(inner: Arc<dyn KeyProvider>) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn cached_usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.lock().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl KeyProvider for KeyCache {
    async fn fetch_keys(&self, username: &str) -> Result<Vec<String>, KeyFetchError> {
        // Held across the fetch so concurrent lookups for one user hit the network once
        let mut entries = self.entries.lock().await;
        if let Some(keys) = entries.get(username) {
            debug!(username, "key cache hit");
            return Ok(keys.clone());
        }

        let keys = self.inner.fetch_keys(username).await?;
        entries.insert(username.to_string(), keys.clone());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl KeyProvider for CountingProvider {
        async fn fetch_keys(&self, username: &str) -> Result<Vec<String>, KeyFetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(KeyFetchError::Transport {
                    url: "https://github.com".into(),
                    message: "offline".into(),
                });
            }
            Ok(vec![format!("ssh-ed25519 AAAA {}", username)])
        }
    }

    #[tokio::test]
    async fn test_repeated_lookups_fetch_once() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail_first: false,
        });
        let cache = KeyCache::new(provider.clone());

        let first = cache.fetch_keys("alice").await.unwrap();
        let second = cache.fetch_keys("alice").await.unwrap();
        cache.fetch_keys("bob").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached_usernames().await, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail_first: true,
        });
        let cache = KeyCache::new(provider.clone());

        assert!(cache.fetch_keys("alice").await.is_err());
        assert!(cache.fetch_keys("alice").await.is_ok());
        assert!(cache.fetch_keys("alice").await.is_ok());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
