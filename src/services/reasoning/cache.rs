// Result Cache
// Bounded, time-boxed, content-addressed memo of extraction results.

use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::debug;

use crate::models::{CacheStats, ExtractionResult};
use crate::services::config_store::ExtractorConfig;

/// Source of timestamps for cache entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// Fingerprint of the first `prefix_chars` characters plus the full length.
/// Distinct texts sharing that prefix and length collide; `ResultCache::get`
/// catches it through the full-text `content_hash`.
pub fn cache_key(text: &str, prefix_chars: usize) -> String {
    let prefix_end = text
        .char_indices()
        .nth(prefix_chars)
        .map(|(b, _)| b)
        .unwrap_or(text.len());
    format!(
        "reasoning_{:016x}_{}",
        fingerprint(&text[..prefix_end]),
        text.chars().count()
    )
}

pub fn content_hash(text: &str) -> u64 {
    fingerprint(text)
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: ExtractionResult,
    timestamp: DateTime<Utc>,
    access_count: u64,
    content_hash: u64,
    max_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Miss {
    Absent,
    ContentMismatch,
    LimitChanged,
    Expired,
}

impl Miss {
    fn as_str(self) -> &'static str {
        match self {
            Miss::Absent => "absent",
            Miss::ContentMismatch => "content_mismatch",
            Miss::LimitChanged => "limit_changed",
            Miss::Expired => "expired",
        }
    }
}

pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
    eviction_ratio: f64,
    hits: u64,
    misses: u64,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("size", &self.entries.len())
            .field("ttl_secs", &self.ttl.num_seconds())
            .field("capacity", &self.capacity)
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

impl ResultCache {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &ExtractorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::seconds(config.cache_ttl_secs as i64),
            capacity: config.cache_capacity.max(1),
            eviction_ratio: config.eviction_ratio.clamp(0.0, 1.0),
            hits: 0,
            misses: 0,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.timestamp > self.ttl
    }

    /// Look up `key`; misses when absent, expired, when `source_text` no
    /// longer matches the text the entry was stored for, or when the entry
    /// was truncated to a different `max_length`. A hit refreshes the entry's
    /// timestamp and access count.
    pub fn get(&mut self, key: &str, source_text: &str, max_length: usize) -> Option<ExtractionResult> {
        let now = self.clock.now();
        let hash = content_hash(source_text);

        let verdict = match self.entries.get(key) {
            None => Err(Miss::Absent),
            Some(entry) if entry.content_hash != hash => Err(Miss::ContentMismatch),
            Some(entry) if self.is_expired(entry, now) => Err(Miss::Expired),
            Some(entry) if entry.max_length != max_length => Err(Miss::LimitChanged),
            Some(_) => Ok(()),
        };

        match verdict {
            Ok(()) => {
                let entry = self.entries.get_mut(key)?;
                entry.access_count += 1;
                entry.timestamp = now;
                self.hits += 1;
                debug!(key, access_count = entry.access_count, "[cache] hit");
                Some(entry.result.clone())
            }
            Err(miss) => {
                if miss == Miss::Expired {
                    self.entries.remove(key);
                }
                self.misses += 1;
                debug!(key, reason = miss.as_str(), "[cache] miss");
                None
            }
        }
    }

    /// Store `result`, produced from `source_text` with `max_length`, under
    /// `key` after dropping expired entries and, when the cache is full,
    /// evicting the least used fifth.
    pub fn set(&mut self, key: &str, result: ExtractionResult, source_text: &str, max_length: usize) {
        self.cleanup();

        let now = self.clock.now();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                result,
                timestamp: now,
                access_count: 0,
                content_hash: content_hash(source_text),
                max_length,
            },
        );
    }

    fn cleanup(&mut self) {
        let now = self.clock.now();
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.timestamp <= ttl);
        let expired = before - self.entries.len();

        if self.entries.len() < self.capacity {
            if expired > 0 {
                debug!(expired, "[cache] dropped expired entries");
            }
            return;
        }

        let mut ranked: Vec<(String, u64, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.access_count, e.timestamp))
            .collect();
        ranked.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.2.cmp(&b.2)));

        let evict = ((ranked.len() as f64 * self.eviction_ratio).ceil() as usize)
            .max(1)
            .min(ranked.len());
        for (key, _, _) in ranked.into_iter().take(evict) {
            self.entries.remove(&key);
        }

        debug!(expired, evicted = evict, remaining = self.entries.len(), "[cache] cleanup");
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let size = self.entries.len();
        let total_access = self.entries.values().map(|e| e.access_count).sum();
        let average_age_seconds = if size == 0 {
            0.0
        } else {
            self.entries
                .values()
                .map(|e| (now - e.timestamp).num_milliseconds() as f64 / 1000.0)
                .sum::<f64>()
                / size as f64
        };
        let lookups = self.hits + self.misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        };

        CacheStats {
            size,
            total_access,
            average_age_seconds,
            hit_rate,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use super::*;
    use std::sync::Mutex;

    /// Clock that only moves when told to.
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
