//! Repositories bound to one shared transaction

use std::sync::Arc;

use async_trait::async_trait;
use kiosk_common::UserId;
use kiosk_errors::{AppError, AppResult};
use sqlx::{Postgres, Transaction};
use tokio::sync::Mutex;

use super::{permission_repository, role_permission_repository, user_override_repository};
use crate::domain::permission::{
    Permission, PermissionId, PermissionRepository, Role, RolePermissionRepository,
    UserOverrideRepository, UserPermissionOverride,
};

/// Shared transaction; `None` once committed or rolled back
pub type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

macro_rules! define_tx_repo {
    ($name:ident) => {
        pub struct $name {
            tx: SharedTx,
        }

        impl $name {
            pub fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

/// Lock the shared transaction and bind `$tx` to its connection
macro_rules! with_tx {
    ($self:ident, $tx:ident) => {
        let mut guard = $self.tx.lock().await;
        let $tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
    };
}

define_tx_repo!(TxPermissionRepository);
define_tx_repo!(TxRolePermissionRepository);
define_tx_repo!(TxUserOverrideRepository);

#[async_trait]
impl PermissionRepository for TxPermissionRepository {
    async fn create(&self, permission: &Permission) -> AppResult<()> {
        with_tx!(self, tx);
        permission_repository::insert(&mut **tx, permission).await
    }

    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>> {
        with_tx!(self, tx);
        permission_repository::fetch_by_id(&mut **tx, id).await
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        with_tx!(self, tx);
        permission_repository::fetch_by_name(&mut **tx, name).await
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        with_tx!(self, tx);
        permission_repository::fetch_by_ids(&mut **tx, ids).await
    }

    async fn list_all(&self) -> AppResult<Vec<Permission>> {
        with_tx!(self, tx);
        permission_repository::fetch_all(&mut **tx).await
    }

    async fn list_by_module(&self, module: &str) -> AppResult<Vec<Permission>> {
        with_tx!(self, tx);
        permission_repository::fetch_by_module(&mut **tx, module).await
    }
}

#[async_trait]
impl RolePermissionRepository for TxRolePermissionRepository {
    async fn list_for_role(&self, role: Role) -> AppResult<Vec<PermissionId>> {
        with_tx!(self, tx);
        role_permission_repository::fetch_for_role(&mut **tx, role).await
    }

    async fn role_has_permission(
        &self,
        role: Role,
        permission_id: &PermissionId,
    ) -> AppResult<bool> {
        with_tx!(self, tx);
        role_permission_repository::exists(&mut **tx, role, permission_id).await
    }

    async fn replace_for_role(&self, role: Role, permission_ids: &[PermissionId]) -> AppResult<()> {
        with_tx!(self, tx);
        role_permission_repository::replace(&mut **tx, role, permission_ids).await
    }
}

#[async_trait]
impl UserOverrideRepository for TxUserOverrideRepository {
    async fn list_for_user(&self, user_id: &UserId) -> AppResult<Vec<UserPermissionOverride>> {
        with_tx!(self, tx);
        user_override_repository::fetch_for_user(&mut **tx, user_id).await
    }

    async fn find(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> AppResult<Option<UserPermissionOverride>> {
        with_tx!(self, tx);
        user_override_repository::fetch_one(&mut **tx, user_id, permission_id).await
    }

    async fn insert(&self, entry: &UserPermissionOverride) -> AppResult<()> {
        with_tx!(self, tx);
        user_override_repository::insert(&mut **tx, entry).await
    }

    async fn set_granted(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        granted: bool,
    ) -> AppResult<bool> {
        with_tx!(self, tx);
        user_override_repository::update_granted(&mut **tx, user_id, permission_id, granted).await
    }

    async fn delete(&self, user_id: &UserId, permission_id: &PermissionId) -> AppResult<bool> {
        with_tx!(self, tx);
        user_override_repository::remove(&mut **tx, user_id, permission_id).await
    }

    async fn replace_for_user(
        &self,
        user_id: &UserId,
        entries: &[UserPermissionOverride],
    ) -> AppResult<()> {
        with_tx!(self, tx);
        user_override_repository::replace(&mut **tx, user_id, entries).await
    }
}
