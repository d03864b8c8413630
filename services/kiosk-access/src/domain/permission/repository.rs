//! Repository interfaces

use async_trait::async_trait;
use kiosk_common::UserId;
use kiosk_errors::AppResult;

use super::override_state::UserPermissionOverride;
use super::permission::{Permission, PermissionId};
use super::role::Role;

/// Permission catalog
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn create(&self, permission: &Permission) -> AppResult<()>;

    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>>;

    /// Lookup by `module.action`
    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>>;

    /// Unknown ids are skipped
    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>>;

    /// Ordered by module, then action
    async fn list_all(&self) -> AppResult<Vec<Permission>>;

    async fn list_by_module(&self, module: &str) -> AppResult<Vec<Permission>>;
}

/// Role default grants
#[async_trait]
pub trait RolePermissionRepository: Send + Sync {
    async fn list_for_role(&self, role: Role) -> AppResult<Vec<PermissionId>>;

    async fn role_has_permission(&self, role: Role, permission_id: &PermissionId)
    -> AppResult<bool>;

    /// Delete every row of `role`, then insert one row per id
    async fn replace_for_role(&self, role: Role, permission_ids: &[PermissionId]) -> AppResult<()>;
}

/// Per-user override rows
#[async_trait]
pub trait UserOverrideRepository: Send + Sync {
    async fn list_for_user(&self, user_id: &UserId) -> AppResult<Vec<UserPermissionOverride>>;

    async fn find(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> AppResult<Option<UserPermissionOverride>>;

    /// Fails with a conflict if the row already exists
    async fn insert(&self, entry: &UserPermissionOverride) -> AppResult<()>;

    /// Returns false when there was no row to update
    async fn set_granted(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        granted: bool,
    ) -> AppResult<bool>;

    /// Returns false when there was no row to delete
    async fn delete(&self, user_id: &UserId, permission_id: &PermissionId) -> AppResult<bool>;

    /// Delete every row of `user_id`, then insert `entries`
    async fn replace_for_user(
        &self,
        user_id: &UserId,
        entries: &[UserPermissionOverride],
    ) -> AppResult<()>;
}
