//! Authoritative permission resolution behind the cache.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use tourhub_core::error::AppError;
use tourhub_core::result::AppResult;
use tourhub_database::repositories::StaffRepository;
use tourhub_entity::staff::Permission;

/// Resolves a principal's current permission set from the
/// authorization source of truth.
#[async_trait]
pub trait PermissionSource: Send + Sync + std::fmt::Debug + 'static {
    /// Load the permission set for a principal.
    async fn load_permissions(&self, principal_id: Uuid) -> AppResult<HashSet<Permission>>;
}

/// Production source: the staff row's role, mapped structurally.
#[derive(Debug, Clone)]
pub struct StaffPermissionSource {
    /// Staff persistence.
    repo: Arc<dyn StaffRepository>,
}

impl StaffPermissionSource {
    /// Creates a new source over the staff repository.
    pub fn new(repo: Arc<dyn StaffRepository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl PermissionSource for StaffPermissionSource {
    async fn load_permissions(&self, principal_id: Uuid) -> AppResult<HashSet<Permission>> {
        let staff = self
            .repo
            .find_by_id(principal_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Staff {principal_id} not found")))?;

        Ok(staff.role.permissions())
    }
}
