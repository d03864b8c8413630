//! Permission query handler

use std::collections::BTreeMap;
use std::sync::Arc;

use kiosk_common::UserId;
use metrics::counter;
use serde::Serialize;
use tracing::debug;

use super::queries::*;
use crate::domain::permission::{
    Decision, DecisionSource, EffectivePermissions, OverrideState, Permission, PermissionId,
    PermissionRepository, Role, RolePermissionRepository, UserOverrideRepository,
    UserPermissionOverride, group_by_module, resolve,
};
use crate::error::{AccessError, AccessResult};

/// One row of the user-permissions editor
#[derive(Debug, Clone, Serialize)]
pub struct PermissionEntry {
    pub permission: Permission,
    pub role_default: bool,
    pub override_state: OverrideState,
    pub effective: bool,
    #[serde(serialize_with = "serialize_source")]
    pub source: DecisionSource,
}

fn serialize_source<S: serde::Serializer>(
    source: &DecisionSource,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(source.as_str())
}

/// Permission query handler
pub struct PermissionQueryHandler<P, RP, UO>
where
    P: PermissionRepository,
    RP: RolePermissionRepository,
    UO: UserOverrideRepository,
{
    permission_repo: Arc<P>,
    role_permission_repo: Arc<RP>,
    user_override_repo: Arc<UO>,
}

impl<P, RP, UO> PermissionQueryHandler<P, RP, UO>
where
    P: PermissionRepository,
    RP: RolePermissionRepository,
    UO: UserOverrideRepository,
{
    pub fn new(
        permission_repo: Arc<P>,
        role_permission_repo: Arc<RP>,
        user_override_repo: Arc<UO>,
    ) -> Self {
        Self {
            permission_repo,
            role_permission_repo,
            user_override_repo,
        }
    }

    /// Full catalog, ordered by module then action
    pub async fn list_permissions(&self) -> AccessResult<Vec<Permission>> {
        self.permission_repo
            .list_all()
            .await
            .map_err(AccessError::load_failed("permissions"))
    }

    /// Catalog grouped the way the editors render it
    pub async fn list_permissions_by_module(
        &self,
    ) -> AccessResult<BTreeMap<String, Vec<Permission>>> {
        Ok(group_by_module(self.list_permissions().await?))
    }

    pub async fn list_module_permissions(&self, module: &str) -> AccessResult<Vec<Permission>> {
        self.permission_repo
            .list_by_module(module)
            .await
            .map_err(AccessError::load_failed("permissions"))
    }

    pub async fn list_role_permissions(&self, role: Role) -> AccessResult<Vec<PermissionId>> {
        self.role_permission_repo
            .list_for_role(role)
            .await
            .map_err(AccessError::load_failed("role permissions"))
    }

    /// True iff the role itself grants the permission
    pub async fn role_has_permission(
        &self,
        role: Role,
        permission_id: &PermissionId,
    ) -> AccessResult<bool> {
        self.role_permission_repo
            .role_has_permission(role, permission_id)
            .await
            .map_err(AccessError::load_failed("role permissions"))
    }

    pub async fn list_user_overrides(
        &self,
        user_id: &UserId,
    ) -> AccessResult<Vec<UserPermissionOverride>> {
        self.user_override_repo
            .list_for_user(user_id)
            .await
            .map_err(AccessError::load_failed("user overrides"))
    }

    /// `Inherited` when no override row exists
    pub async fn user_override_state(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> AccessResult<OverrideState> {
        let row = self
            .user_override_repo
            .find(user_id, permission_id)
            .await
            .map_err(AccessError::load_failed("user overrides"))?;

        Ok(row.map(|o| o.state()).unwrap_or_default())
    }

    /// Override value if present, otherwise the role default
    pub async fn effective_permission(&self, query: EffectivePermissionQuery) -> AccessResult<bool> {
        let decision = self
            .decide(&query.user_id, query.role, &query.permission_id)
            .await?;
        Ok(decision.allowed)
    }

    /// Same decision as [`Self::effective_permission`], keyed by `module.action`
    pub async fn check_permission(&self, query: CheckPermissionQuery) -> AccessResult<bool> {
        let role = query.role()?;
        if Permission::split_name(&query.permission).is_none() {
            return Err(AccessError::PermissionNameNotFound(query.permission));
        }

        let permission = self
            .permission_repo
            .find_by_name(&query.permission)
            .await
            .map_err(AccessError::load_failed("permissions"))?
            .ok_or_else(|| AccessError::PermissionNameNotFound(query.permission.clone()))?;

        let decision = self.decide(&query.user_id, role, &permission.id).await?;
        Ok(decision.allowed)
    }

    /// Snapshot answering any number of checks for one user
    pub async fn effective_permissions(
        &self,
        user_id: &UserId,
        role: Role,
    ) -> AccessResult<EffectivePermissions> {
        let role_grants = self.list_role_permissions(role).await?;
        let overrides = self.list_user_overrides(user_id).await?;
        Ok(EffectivePermissions::new(role, role_grants, overrides))
    }

    /// One entry per catalog permission
    pub async fn user_permission_matrix(
        &self,
        query: UserPermissionMatrixQuery,
    ) -> AccessResult<Vec<PermissionEntry>> {
        let permissions = self.list_permissions().await?;
        let effective = self.effective_permissions(&query.user_id, query.role).await?;

        Ok(permissions
            .into_iter()
            .map(|permission| {
                let decision = effective.decide(&permission.id);
                PermissionEntry {
                    role_default: effective.role_has_permission(&permission.id),
                    override_state: effective.override_state(&permission.id),
                    effective: decision.allowed,
                    source: decision.source,
                    permission,
                }
            })
            .collect())
    }

    async fn decide(
        &self,
        user_id: &UserId,
        role: Role,
        permission_id: &PermissionId,
    ) -> AccessResult<Decision> {
        let state = self.user_override_state(user_id, permission_id).await?;
        // role default only matters when nothing is overridden
        let role_has_permission = match state {
            OverrideState::Inherited => self.role_has_permission(role, permission_id).await?,
            OverrideState::Granted | OverrideState::Revoked => false,
        };

        let decision = resolve(role_has_permission, state);
        debug!(
            user_id = %user_id,
            role = %role,
            permission_id = %permission_id,
            allowed = decision.allowed,
            source = %decision.source,
            "Permission resolved"
        );
        counter!(
            "permission_checks_total",
            "source" => decision.source.as_str(),
            "allowed" => if decision.allowed { "true" } else { "false" }
        )
        .increment(1);

        Ok(decision)
    }
}
