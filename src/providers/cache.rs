//! Opt-in replay cache for completion requests
//!
//! Wraps another provider and answers byte-identical requests (same model,
//! parameters and `(role, content)` sequence) from memory for a bounded time.
//! Only enable it when replaying an identical conversation should return the
//! identical reply.

use crate::error::Result;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

type CacheEntries = HashMap<String, (CompletionResponse, Instant)>;

/// Provider decorator that memoizes exact requests
pub struct CachingProvider {
    inner: Arc<dyn Provider>,
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<CacheEntries>,
}

impl CachingProvider {
    /// Wrap `inner` with a cache of at most `max_entries` replies, each valid
    /// for `ttl`
    ///
    /// # Examples
    ///
    /// ```
    /// use beechat::config::ProviderConfig;
    /// use beechat::providers::{CachingProvider, OpenAiProvider};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let inner = OpenAiProvider::new(&ProviderConfig::default(), "sk-test").unwrap();
    /// let cached = CachingProvider::new(Arc::new(inner), Duration::from_secs(3600), 128);
    /// assert!(cached.is_empty());
    /// ```
    pub fn new(inner: Arc<dyn Provider>, ttl: Duration, max_entries: usize) -> Self {
        tracing::info!(
            ttl_secs = ttl.as_secs(),
            max_entries,
            "Replay cache enabled for provider {}",
            inner.name()
        );
        Self {
            inner,
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached replies, including expired ones not yet evicted
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache holds no replies
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &str) -> Option<CompletionResponse> {
        let entries = self.entries.read().ok()?;
        let (response, cached_at) = entries.get(key)?;
        if cached_at.elapsed() < self.ttl {
            Some(response.clone())
        } else {
            None
        }
    }

    fn store(&self, key: String, response: CompletionResponse) {
        let Ok(mut entries) = self.entries.write() else {
            tracing::warn!("Replay cache lock poisoned; reply not cached");
            return;
        };

        let ttl = self.ttl;
        entries.retain(|_, (_, cached_at)| cached_at.elapsed() < ttl);

        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (_, cached_at))| *cached_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(key, (response, Instant::now()));
    }
}

#[async_trait]
impl Provider for CachingProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let key = request.cache_key();

        if let Some(hit) = self.lookup(&key) {
            tracing::debug!("Replay cache hit");
            return Ok(hit);
        }

        let response = self.inner.complete(request).await?;
        self.store(key, response.clone());
        Ok(response)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
