//! Per-user answer cache with a fixed time-to-live.

use crate::config::CacheSettings;
use crate::types::AnswerResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Answer memo keyed by `(user_id, lowercased query)`.
///
/// Losing entries only costs recomputation; implementations may drop them at
/// any time.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Cached answer younger than the TTL, if any.
    async fn get(&self, user_id: &str, query: &str) -> Option<AnswerResult>;

    /// Store or overwrite the answer for this user and query.
    async fn put(&self, user_id: &str, query: &str, result: AnswerResult);

    /// Drop expired entries; returns how many were removed.
    async fn sweep(&self) -> usize;
}

type CacheKey = (String, String);

fn cache_key(user_id: &str, query: &str) -> CacheKey {
    (user_id.to_string(), query.to_lowercase())
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: AnswerResult,
    created_at: Instant,
}

/// In-process cache. Expired entries are swept on write once the map grows
/// past the high-water mark.
#[derive(Debug)]
pub struct InMemoryResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    high_water_mark: usize,
}

impl InMemoryResponseCache {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: settings.ttl(),
            high_water_mark: settings.high_water_mark,
        }
    }

    /// Number of stored entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new(&CacheSettings::default())
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, user_id: &str, query: &str) -> Option<AnswerResult> {
        let entries = self.entries.read().await;
        let entry = entries.get(&cache_key(user_id, query))?;

        if entry.created_at.elapsed() < self.ttl {
            Some(entry.result.clone())
        } else {
            None
        }
    }

    async fn put(&self, user_id: &str, query: &str, result: AnswerResult) {
        let len = {
            let mut entries = self.entries.write().await;
            entries.insert(
                cache_key(user_id, query),
                CacheEntry {
                    result,
                    created_at: Instant::now(),
                },
            );
            entries.len()
        };

        if len > self.high_water_mark {
            let removed = self.sweep().await;
            tracing::debug!("Cache over {} entries, swept {}", self.high_water_mark, removed);
        }
    }

    async fn sweep(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.created_at.elapsed() < ttl);
        before - entries.len()
    }
}
