//! In-process permission cache with TTL and explicit invalidation.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use tourhub_core::clock::Clock;
use tourhub_core::result::AppResult;
use tourhub_entity::staff::Permission;

use super::source::PermissionSource;

/// Caches principal → permission-set with a clock-driven TTL.
///
/// Entries expire passively after the TTL and must be purged explicitly
/// on role mutation so security-relevant changes are not bound by the
/// TTL alone. The cache is process-local: in a multi-instance
/// deployment, other instances may serve the old set for up to one TTL
/// after a change — an accepted, documented staleness window.
#[derive(Debug, Clone)]
pub struct PermissionCache {
    /// Authoritative permission source.
    source: Arc<dyn PermissionSource>,
    /// Injected clock.
    clock: Arc<dyn Clock>,
    /// Entry time-to-live.
    ttl: Duration,
    /// Cached entries keyed by principal.
    entries: Arc<DashMap<Uuid, CacheEntry>>,
}

/// One cached permission set with its stamp.
#[derive(Debug, Clone)]
struct CacheEntry {
    permissions: HashSet<Permission>,
    cached_at: DateTime<Utc>,
}

impl PermissionCache {
    /// Creates a new cache over the given source.
    pub fn new(source: Arc<dyn PermissionSource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl,
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Returns the principal's permission set, from cache when fresh.
    pub async fn get(&self, principal_id: Uuid) -> AppResult<HashSet<Permission>> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(&principal_id) {
            if now - entry.cached_at < self.ttl {
                return Ok(entry.permissions.clone());
            }
        }

        let permissions = self.source.load_permissions(principal_id).await?;
        self.entries.insert(
            principal_id,
            CacheEntry {
                permissions: permissions.clone(),
                cached_at: now,
            },
        );

        debug!(principal_id = %principal_id, "Permission cache refreshed");
        Ok(permissions)
    }

    /// Drops the cached entry for one principal.
    ///
    /// Must be called on role or permission mutation; TTL expiry alone is
    /// not acceptable for security-sensitive changes.
    pub fn invalidate(&self, principal_id: Uuid) {
        self.entries.remove(&principal_id);
    }

    /// Drops every cached entry.
    pub fn invalidate_all(&self) {
        self.entries.clear();
    }
}
