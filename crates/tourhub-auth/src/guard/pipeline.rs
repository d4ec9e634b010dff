//! Ordered predicate stages over an authenticated request context.
//!
//! Call sites declare what they require; the pipeline verifies the
//! token, loads the principal once, and runs the stages in declaration
//! order, short-circuiting on the first failure.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::info;

use tourhub_core::error::AppError;
use tourhub_core::result::AppResult;
use tourhub_database::repositories::StaffRepository;
use tourhub_entity::principal::PrincipalType;
use tourhub_entity::staff::{Permission, Staff, StaffRole, StaffStatus};

use crate::permission::PermissionCache;
use crate::token::{AccessClaims, TokenVerifier};

/// The authenticated context a request carries past the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Verified token claims.
    pub claims: AccessClaims,
    /// The principal's current row.
    pub staff: Staff,
    /// Resolved permissions, when a permission stage ran.
    pub permissions: Option<HashSet<Permission>>,
}

/// One predicate stage.
#[derive(Debug, Clone)]
enum GuardStage {
    /// The account must be active.
    AccountActive,
    /// The token's principal type must be one of these.
    PrincipalTypes(Vec<PrincipalType>),
    /// The principal's role must be at least this privileged.
    MinimumRole(StaffRole),
    /// The principal must hold all of these permissions.
    Permissions(Vec<Permission>),
}

/// Declarative authorization pipeline.
#[derive(Clone)]
pub struct GuardPipeline {
    /// Token validation.
    verifier: Arc<TokenVerifier>,
    /// Staff persistence.
    staff_repo: Arc<dyn StaffRepository>,
    /// Permission cache feeding permission stages.
    permissions: Arc<PermissionCache>,
    /// Stages in declaration order.
    stages: Vec<GuardStage>,
}

impl std::fmt::Debug for GuardPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardPipeline")
            .field("stages", &self.stages)
            .finish()
    }
}

impl GuardPipeline {
    /// Starts building a pipeline over the given collaborators.
    pub fn builder(
        verifier: Arc<TokenVerifier>,
        staff_repo: Arc<dyn StaffRepository>,
        permissions: Arc<PermissionCache>,
    ) -> GuardPipelineBuilder {
        GuardPipelineBuilder {
            verifier,
            staff_repo,
            permissions,
            stages: Vec::new(),
        }
    }

    /// Verifies the token and runs every stage in order.
    ///
    /// The first failing stage decides the error; later stages do not
    /// run. Super admins pass role and permission stages structurally.
    pub async fn authorize(&self, token: &str) -> AppResult<RequestContext> {
        let claims = self.verifier.verify(token).await?;

        let staff = self
            .staff_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::account_inactive("Principal no longer exists"))?;

        let mut resolved_permissions: Option<HashSet<Permission>> = None;

        for stage in &self.stages {
            match stage {
                GuardStage::AccountActive => match staff.status {
                    StaffStatus::Active => {}
                    StaffStatus::Inactive => {
                        self.deny(&staff, "account_inactive");
                        return Err(AppError::account_inactive("Account is deactivated"));
                    }
                    StaffStatus::Blocked => {
                        self.deny(&staff, "account_blocked");
                        return Err(AppError::account_blocked("Account is blocked"));
                    }
                },
                GuardStage::PrincipalTypes(allowed) => {
                    if !allowed.contains(&claims.principal_type) {
                        self.deny(&staff, "principal_type");
                        return Err(AppError::authorization(format!(
                            "Principal type '{}' is not allowed here",
                            claims.principal_type
                        )));
                    }
                }
                GuardStage::MinimumRole(minimum) => {
                    if !staff.role.is_super_admin() && !staff.role.has_at_least(minimum) {
                        self.deny(&staff, "role");
                        return Err(AppError::authorization(format!(
                            "Role '{}' is insufficient; minimum required: '{minimum}'",
                            staff.role
                        )));
                    }
                }
                GuardStage::Permissions(required) => {
                    if staff.role.is_super_admin() {
                        continue;
                    }
                    if resolved_permissions.is_none() {
                        resolved_permissions = Some(self.permissions.get(staff.id).await?);
                    }
                    let held = resolved_permissions
                        .as_ref()
                        .expect("permissions resolved above");
                    if let Some(missing) = required.iter().find(|p| !held.contains(p)) {
                        self.deny(&staff, missing.as_str());
                        return Err(AppError::authorization(format!(
                            "Missing permission '{missing}'"
                        )));
                    }
                }
            }
        }

        info!(
            target: "audit",
            principal_id = %staff.id,
            outcome = "granted",
            "Authorization granted"
        );

        Ok(RequestContext {
            claims,
            staff,
            permissions: resolved_permissions,
        })
    }

    fn deny(&self, staff: &Staff, reason: &str) {
        info!(
            target: "audit",
            principal_id = %staff.id,
            outcome = "denied",
            reason = reason,
            "Authorization denied"
        );
    }
}

/// Builder for [`GuardPipeline`].
pub struct GuardPipelineBuilder {
    verifier: Arc<TokenVerifier>,
    staff_repo: Arc<dyn StaffRepository>,
    permissions: Arc<PermissionCache>,
    stages: Vec<GuardStage>,
}

impl GuardPipelineBuilder {
    /// Require the account to be active.
    pub fn require_account_active(mut self) -> Self {
        self.stages.push(GuardStage::AccountActive);
        self
    }

    /// Require the token's principal type to be one of the given set.
    pub fn require_principal_types(mut self, types: &[PrincipalType]) -> Self {
        self.stages.push(GuardStage::PrincipalTypes(types.to_vec()));
        self
    }

    /// Require at least the given role.
    pub fn require_min_role(mut self, role: StaffRole) -> Self {
        self.stages.push(GuardStage::MinimumRole(role));
        self
    }

    /// Require all of the given permissions.
    pub fn require_permissions(mut self, permissions: &[Permission]) -> Self {
        self.stages
            .push(GuardStage::Permissions(permissions.to_vec()));
        self
    }

    /// Finish building.
    pub fn build(self) -> GuardPipeline {
        GuardPipeline {
            verifier: self.verifier,
            staff_repo: self.staff_repo,
            permissions: self.permissions,
            stages: self.stages,
        }
    }
}
