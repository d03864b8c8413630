//! In-process access store
//!
//! Same tables and constraints as the PostgreSQL schema, kept in memory.
//! Used by tests and by deployments embedding the resolver without a
//! database. A unit of work holds the store's write lock until it ends, so
//! saves are serialized and readers never see a half-applied replace.

mod state;

use std::sync::Arc;

use async_trait::async_trait;
use kiosk_common::UserId;
use kiosk_errors::AppResult;
use parking_lot::Mutex;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

pub use state::AccessState;

use crate::domain::permission::{
    Permission, PermissionId, PermissionRepository, Role, RolePermissionRepository,
    UserOverrideRepository, UserPermissionOverride,
};
use crate::domain::unit_of_work::{SaveScope, UnitOfWork, UnitOfWorkFactory};

#[derive(Clone, Default)]
pub struct InMemoryAccessStore {
    state: Arc<RwLock<AccessState>>,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a unit of work; waits for any unit of work already open
    pub async fn begin_unit(&self) -> InMemoryUnitOfWork {
        let guard = self.state.clone().write_owned().await;
        let staged = StagedAccess::new((*guard).clone());
        InMemoryUnitOfWork { guard, staged }
    }

    /// Copy of the committed tables
    pub async fn snapshot(&self) -> AccessState {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryAccessStore {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(self.begin_unit().await))
    }
}

#[async_trait]
impl PermissionRepository for InMemoryAccessStore {
    async fn create(&self, permission: &Permission) -> AppResult<()> {
        self.state.write().await.create_permission(permission)
    }

    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.state.read().await.permission(id))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self.state.read().await.permission_by_name(name))
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        Ok(self.state.read().await.permissions_by_ids(ids))
    }

    async fn list_all(&self) -> AppResult<Vec<Permission>> {
        Ok(self.state.read().await.all_permissions())
    }

    async fn list_by_module(&self, module: &str) -> AppResult<Vec<Permission>> {
        Ok(self.state.read().await.module_permissions(module))
    }
}

#[async_trait]
impl RolePermissionRepository for InMemoryAccessStore {
    async fn list_for_role(&self, role: Role) -> AppResult<Vec<PermissionId>> {
        Ok(self.state.read().await.role_permissions(role))
    }

    async fn role_has_permission(
        &self,
        role: Role,
        permission_id: &PermissionId,
    ) -> AppResult<bool> {
        Ok(self.state.read().await.role_has_permission(role, permission_id))
    }

    async fn replace_for_role(&self, role: Role, permission_ids: &[PermissionId]) -> AppResult<()> {
        self.state
            .write()
            .await
            .replace_role_permissions(role, permission_ids)
    }
}

#[async_trait]
impl UserOverrideRepository for InMemoryAccessStore {
    async fn list_for_user(&self, user_id: &UserId) -> AppResult<Vec<UserPermissionOverride>> {
        Ok(self.state.read().await.user_overrides(user_id))
    }

    async fn find(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> AppResult<Option<UserPermissionOverride>> {
        Ok(self.state.read().await.user_override(user_id, permission_id))
    }

    async fn insert(&self, entry: &UserPermissionOverride) -> AppResult<()> {
        self.state.write().await.insert_override(entry)
    }

    async fn set_granted(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        granted: bool,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .write()
            .await
            .set_override_granted(user_id, permission_id, granted))
    }

    async fn delete(&self, user_id: &UserId, permission_id: &PermissionId) -> AppResult<bool> {
        Ok(self.state.write().await.delete_override(user_id, permission_id))
    }

    async fn replace_for_user(
        &self,
        user_id: &UserId,
        entries: &[UserPermissionOverride],
    ) -> AppResult<()> {
        self.state
            .write()
            .await
            .replace_user_overrides(user_id, entries)
    }
}

/// Working copy written by a unit of work
#[derive(Clone)]
pub struct StagedAccess {
    state: Arc<Mutex<AccessState>>,
}

impl StagedAccess {
    fn new(state: AccessState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn take(&self) -> AccessState {
        std::mem::take(&mut *self.state.lock())
    }
}

#[async_trait]
impl PermissionRepository for StagedAccess {
    async fn create(&self, permission: &Permission) -> AppResult<()> {
        self.state.lock().create_permission(permission)
    }

    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.state.lock().permission(id))
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        Ok(self.state.lock().permission_by_name(name))
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        Ok(self.state.lock().permissions_by_ids(ids))
    }

    async fn list_all(&self) -> AppResult<Vec<Permission>> {
        Ok(self.state.lock().all_permissions())
    }

    async fn list_by_module(&self, module: &str) -> AppResult<Vec<Permission>> {
        Ok(self.state.lock().module_permissions(module))
    }
}

#[async_trait]
impl RolePermissionRepository for StagedAccess {
    async fn list_for_role(&self, role: Role) -> AppResult<Vec<PermissionId>> {
        Ok(self.state.lock().role_permissions(role))
    }

    async fn role_has_permission(
        &self,
        role: Role,
        permission_id: &PermissionId,
    ) -> AppResult<bool> {
        Ok(self.state.lock().role_has_permission(role, permission_id))
    }

    async fn replace_for_role(&self, role: Role, permission_ids: &[PermissionId]) -> AppResult<()> {
        self.state
            .lock()
            .replace_role_permissions(role, permission_ids)
    }
}

#[async_trait]
impl UserOverrideRepository for StagedAccess {
    async fn list_for_user(&self, user_id: &UserId) -> AppResult<Vec<UserPermissionOverride>> {
        Ok(self.state.lock().user_overrides(user_id))
    }

    async fn find(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> AppResult<Option<UserPermissionOverride>> {
        Ok(self.state.lock().user_override(user_id, permission_id))
    }

    async fn insert(&self, entry: &UserPermissionOverride) -> AppResult<()> {
        self.state.lock().insert_override(entry)
    }

    async fn set_granted(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        granted: bool,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .set_override_granted(user_id, permission_id, granted))
    }

    async fn delete(&self, user_id: &UserId, permission_id: &PermissionId) -> AppResult<bool> {
        Ok(self.state.lock().delete_override(user_id, permission_id))
    }

    async fn replace_for_user(
        &self,
        user_id: &UserId,
        entries: &[UserPermissionOverride],
    ) -> AppResult<()> {
        self.state.lock().replace_user_overrides(user_id, entries)
    }
}

/// Unit of work over [`InMemoryAccessStore`]
///
/// Dropping it without committing discards the staged changes.
pub struct InMemoryUnitOfWork {
    guard: OwnedRwLockWriteGuard<AccessState>,
    staged: StagedAccess,
}

impl InMemoryUnitOfWork {
    pub fn staged(&self) -> &StagedAccess {
        &self.staged
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    fn permissions(&self) -> &dyn PermissionRepository {
        &self.staged
    }

    fn role_permissions(&self) -> &dyn RolePermissionRepository {
        &self.staged
    }

    fn user_overrides(&self) -> &dyn UserOverrideRepository {
        &self.staged
    }

    // the write guard already excludes every other unit of work
    async fn lock_scope(&self, _scope: &SaveScope) -> AppResult<()> {
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let InMemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged.take();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
