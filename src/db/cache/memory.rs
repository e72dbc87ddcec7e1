use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommendation(String),
    Venue(String),
    VenueRecommendations(String),
    Geocode(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendation(id) => write!(f, "recommendation:{}", id),
            CacheKey::Venue(id) => write!(f, "venue:{}", id),
            CacheKey::VenueRecommendations(id) => write!(f, "venue:{}:recommendations", id),
            CacheKey::Geocode(address) => {
                write!(f, "geocode:{}", address.trim().to_lowercase())
            }
        }
    }
}

/// Named expiration classes used by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    Short,
    Medium,
    Long,
}

/// Concrete durations behind each [`CacheTtl`] class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPresets {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
}

impl TtlPresets {
    pub fn duration(&self, ttl: CacheTtl) -> Duration {
        match ttl {
            CacheTtl::Short => self.short,
            CacheTtl::Medium => self.medium,
            CacheTtl::Long => self.long,
        }
    }
}

impl Default for TtlPresets {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(5 * 60),
            medium: Duration::from_secs(30 * 60),
            long: Duration::from_secs(24 * 60 * 60),
        }
    }
}

struct CacheEntry {
    value: serde_json::Value,
    /// `None` when `now + ttl` is not representable, i.e. the entry never expires
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }
}

/// Process-local cache with per-entry time-to-live
///
/// Cloning is cheap and every clone shares the same entries. Expired entries are
/// evicted lazily on the next `get` for their key; there is no background sweep
/// and no size bound. The cache holds no authority: losing it only costs refetches.
#[derive(Clone, Default)]
pub struct Cache {
    entries: Arc<DashMap<String, CacheEntry>>,
    presets: TtlPresets,
}

impl Cache {
    pub fn new(presets: TtlPresets) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            presets,
        }
    }

    pub fn presets(&self) -> TtlPresets {
        self.presets
    }

    /// Retrieves a live value by key
    ///
    /// Returns `None` on a miss, on an expired entry (which is removed), or when the
    /// stored value does not deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        if self
            .entries
            .remove_if(key, |_, entry| !entry.is_live(now))
            .is_some()
        {
            tracing::debug!(key = %key, "Evicted expired cache entry");
            return None;
        }

        let value = self.entries.get(key).map(|entry| entry.value.clone())?;

        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache deserialization error");
                None
            }
        }
    }

    /// Stores a value, replacing any existing entry for the key
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache serialization error");
                return;
            }
        };

        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    pub fn delete(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            tracing::debug!(key = %key, "Invalidated cache entry");
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet observed by `get`
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
