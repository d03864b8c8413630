//! PostgreSQL Unit of Work

use std::sync::Arc;

use async_trait::async_trait;
use kiosk_adapter_postgres::{TransactionManager, TransactionOptions, advisory_xact_lock};
use kiosk_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::Mutex;

use super::tx_repositories::{
    SharedTx, TxPermissionRepository, TxRolePermissionRepository, TxUserOverrideRepository,
};
use crate::domain::permission::{
    PermissionRepository, RolePermissionRepository, UserOverrideRepository,
};
use crate::domain::unit_of_work::{SaveScope, UnitOfWork, UnitOfWorkFactory};

pub struct PostgresUnitOfWorkFactory {
    tx_manager: TransactionManager,
    options: TransactionOptions,
    lock_scopes: bool,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tx_manager: TransactionManager::new(pool),
            options: TransactionOptions::default(),
            lock_scopes: true,
        }
    }

    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }

    /// Disable the per-scope advisory lock
    pub fn with_scope_locks(mut self, enabled: bool) -> Self {
        self.lock_scopes = enabled;
        self
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.tx_manager.begin_with_options(&self.options).await?;
        Ok(Box::new(PostgresUnitOfWork::new(tx, self.lock_scopes)))
    }
}

pub struct PostgresUnitOfWork {
    tx: SharedTx,
    lock_scopes: bool,
    permission_repo: TxPermissionRepository,
    role_permission_repo: TxRolePermissionRepository,
    user_override_repo: TxUserOverrideRepository,
}

impl PostgresUnitOfWork {
    pub fn new(tx: Transaction<'static, Postgres>, lock_scopes: bool) -> Self {
        let tx = Arc::new(Mutex::new(Some(tx)));

        Self {
            tx: tx.clone(),
            lock_scopes,
            permission_repo: TxPermissionRepository::new(tx.clone()),
            role_permission_repo: TxRolePermissionRepository::new(tx.clone()),
            user_override_repo: TxUserOverrideRepository::new(tx),
        }
    }

    async fn take(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed"))
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn permissions(&self) -> &dyn PermissionRepository {
        &self.permission_repo
    }

    fn role_permissions(&self) -> &dyn RolePermissionRepository {
        &self.role_permission_repo
    }

    fn user_overrides(&self) -> &dyn UserOverrideRepository {
        &self.user_override_repo
    }

    async fn lock_scope(&self, scope: &SaveScope) -> AppResult<()> {
        if !self.lock_scopes {
            return Ok(());
        }

        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        advisory_xact_lock(&mut **tx, &scope.lock_key()).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let tx = self.take().await?;
        TransactionManager::commit(tx).await
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let tx = self.take().await?;
        TransactionManager::rollback(tx).await
    }
}
