//! In-memory tenant cache with TTL (spec §4.9, C9).
//!
//! Shared across sessions and protected by fine-grained locking around map
//! operations; tenant snapshots are immutable once returned (spec §5
//! "Shared resources").

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rc_domain::{Result, TenantSnapshot};

use crate::store::TenantStore;

struct CacheEntry {
    snapshot: TenantSnapshot,
    cached_at: Instant,
}

/// Resolves a tenant key (or dialed number) to a snapshot, caching hits for
/// `ttl` before re-reading the backing store (spec §4.9: "default 5
/// minutes; on miss, read from the tenant store").
pub struct TenantCache {
    store: TenantStore,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl TenantCache {
    pub fn new(store: TenantStore, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn load(path: &Path, ttl: Duration) -> Result<Self> {
        Ok(Self::new(TenantStore::load(path)?, ttl))
    }

    /// Resolve a tenant snapshot, using a cached value when still fresh.
    /// An unresolvable key yields the safe generic snapshot rather than an
    /// error (spec §4.9, §7 `TenantUnknown`) — the call still proceeds.
    pub fn resolve(&self, tenant_key: &str, dialed_number: &str) -> TenantSnapshot {
        {
            let entries = self.entries.read();
            if let Some(entry) = entries.get(tenant_key) {
                if entry.cached_at.elapsed() < self.ttl {
                    return entry.snapshot.clone();
                }
            }
        }

        match self.store.resolve(tenant_key, dialed_number) {
            Some(snapshot) => {
                let mut entries = self.entries.write();
                entries.insert(
                    tenant_key.to_owned(),
                    CacheEntry {
                        snapshot: snapshot.clone(),
                        cached_at: Instant::now(),
                    },
                );
                snapshot
            }
            None => {
                tracing::warn!(tenant_key, "tenant unresolved, serving generic snapshot");
                TenantSnapshot::generic()
            }
        }
    }

    /// Force a re-read on the next `resolve` for this key, bypassing the
    /// TTL (used by the doctor CLI and by tests).
    pub fn invalidate(&self, tenant_key: &str) {
        self.entries.write().remove(tenant_key);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn store_with_one_tenant() -> TenantStore {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(
            br#"
            [[tenant]]
            tenant_id = "acme-plumb"
            dialed_number = "+15551230000"
            display_name = "Acme Plumbing"
            "#,
        )
        .unwrap();
        TenantStore::load(f.path()).unwrap()
    }

    #[test]
    fn resolves_and_caches_hit() {
        let cache = TenantCache::new(store_with_one_tenant(), Duration::from_secs(60));
        let snap = cache.resolve("acme-plumb", "unused");
        assert_eq!(snap.tenant_id, "acme-plumb");
        assert!(!snap.is_generic);
    }

    #[test]
    fn unknown_tenant_yields_generic() {
        let cache = TenantCache::new(store_with_one_tenant(), Duration::from_secs(60));
        let snap = cache.resolve("nope", "nope");
        assert!(snap.is_generic);
    }

    #[test]
    fn expired_entry_is_refetched() {
        let cache = TenantCache::new(store_with_one_tenant(), Duration::from_millis(1));
        let first = cache.resolve("acme-plumb", "unused");
        std::thread::sleep(Duration::from_millis(5));
        let second = cache.resolve("acme-plumb", "unused");
        assert_eq!(first.tenant_id, second.tenant_id);
    }

    #[test]
    fn invalidate_forces_refetch() {
        let cache = TenantCache::new(store_with_one_tenant(), Duration::from_secs(60));
        cache.resolve("acme-plumb", "unused");
        cache.invalidate("acme-plumb");
        let snap = cache.resolve("acme-plumb", "unused");
        assert_eq!(snap.tenant_id, "acme-plumb");
    }
}
