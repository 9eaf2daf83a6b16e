//! # Shared Cache
//!
//! Cross-thread map from chain id to a closed chain.
//!
//! Only closed chains reach this map, and they arrive as `Arc<Chain>`, so a
//! published chain can be read from any thread without further locking.
//! Publishing an id that is already present replaces the entry.

use crate::chain::Chain;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent id → chain store.
#[derive(Debug, Default)]
pub struct ShareSpace {
    chains: DashMap<String, Arc<Chain>>,
}

impl ShareSpace {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a closed chain under `id`. The last publish wins.
    pub fn publish(&self, id: &str, chain: Arc<Chain>) -> Option<Arc<Chain>> {
        self.chains.insert(id.to_string(), chain)
    }

    /// Look a chain up.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Chain>> {
        self.chains.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Check if an id is published.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.chains.contains_key(id)
    }

    /// Drop a published chain.
    pub fn remove(&self, id: &str) -> Option<Arc<Chain>> {
        self.chains.remove(id).map(|(_, chain)| chain)
    }

    /// Number of published chains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Check if nothing is published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallToken;

    fn closed(token: u64, id: &str) -> Arc<Chain> {
        let mut chain = Chain::new(CallToken(token), Some(id.to_string()), 8);
        chain.close();
        Arc::new(chain)
    }

    #[test]
    fn last_publish_wins() {
        let cache = ShareSpace::new();
        let first = closed(1, "users");
        let second = closed(2, "users");

        assert!(cache.publish("users", Arc::clone(&first)).is_none());
        let replaced = cache.publish("users", Arc::clone(&second));
        assert!(replaced.is_some_and(|old| Arc::ptr_eq(&old, &first)));

        let current = cache.get("users").expect("published");
        assert!(Arc::ptr_eq(&current, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_publish() {
        let cache = Arc::new(ShareSpace::new());
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.publish(&format!("chain-{}", i % 4), closed(i, "x"));
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread");
        }
        assert_eq!(cache.len(), 4);
        assert!(cache.remove("chain-0").is_some());
        assert!(!cache.contains("chain-0"));
    }
}
