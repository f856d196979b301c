//! Listing cache kept in the key-value store.

use std::time::Duration;

use chrono::{DateTime, Utc};

use aiqx_core::store::{read_json, write_json, KvStore};
use aiqx_core::traits::{CatalogEntry, PackSource};

/// Storage key for the cached entries.
pub const LISTING_KEY: &str = "github_test_packs";
/// Storage key for the fetch time, in epoch milliseconds.
pub const LISTING_TIME_KEY: &str = "github_test_packs_time";

/// A catalog listing and whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub entries: Vec<CatalogEntry>,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
}

pub struct ListingCache<'a> {
    store: &'a dyn KvStore,
    ttl: Duration,
}

impl<'a> ListingCache<'a> {
    pub fn new(store: &'a dyn KvStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// The cached listing if it is younger than the TTL at `now`.
    pub fn get(&self, now: DateTime<Utc>) -> anyhow::Result<Option<Listing>> {
        let Some(raw_time) = self.store.get(LISTING_TIME_KEY)? else {
            return Ok(None);
        };
        let Ok(millis) = raw_time.trim().parse::<i64>() else {
            tracing::warn!(value = %raw_time, "ignoring unreadable listing cache time");
            return Ok(None);
        };
        let Some(fetched_at) = DateTime::from_timestamp_millis(millis) else {
            return Ok(None);
        };

        let age = now.signed_duration_since(fetched_at);
        let fresh = age
            .to_std()
            .map(|age| age < self.ttl)
            // A fetch time in the future counts as fresh.
            .unwrap_or(true);
        if !fresh {
            tracing::debug!(age_secs = age.num_seconds(), "listing cache expired");
            return Ok(None);
        }

        let entries: Option<Vec<CatalogEntry>> = read_json(self.store, LISTING_KEY)?;
        Ok(entries.map(|entries| Listing {
            entries,
            fetched_at,
            from_cache: true,
        }))
    }

    pub fn put(&self, entries: &[CatalogEntry], now: DateTime<Utc>) -> anyhow::Result<()> {
        write_json(self.store, LISTING_KEY, entries)?;
        self.store
            .set(LISTING_TIME_KEY, &now.timestamp_millis().to_string())
    }

    pub fn invalidate(&self) -> anyhow::Result<()> {
        self.store.remove(LISTING_TIME_KEY)?;
        self.store.remove(LISTING_KEY)
    }
}

/// List `source`, reusing a fresh cached listing unless `refresh` is set.
pub async fn list_cached(
    source: &dyn PackSource,
    cache: &ListingCache<'_>,
    now: DateTime<Utc>,
    refresh: bool,
) -> anyhow::Result<Listing> {
    if !refresh {
        if let Some(listing) = cache.get(now)? {
            tracing::debug!(count = listing.entries.len(), "listing cache hit");
            return Ok(listing);
        }
    }
    tracing::debug!(source = source.name(), refresh, "listing cache miss");

    let entries = source.list().await?;
    cache.put(&entries, now)?;
    Ok(Listing {
        entries,
        fetched_at: now,
        from_cache: false,
    })
}
