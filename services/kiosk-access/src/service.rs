//! Wiring of handlers to a store

use std::sync::Arc;

use kiosk_adapter_postgres::TransactionOptions;
use kiosk_config::AccessConfig;
use sqlx::PgPool;

use crate::application::{PermissionCommandHandler, PermissionQueryHandler};
use crate::domain::permission::{
    PermissionRepository, RolePermissionRepository, UserOverrideRepository,
};
use crate::infrastructure::memory::InMemoryAccessStore;
use crate::infrastructure::persistence::{
    PostgresPermissionRepository, PostgresRolePermissionRepository, PostgresUnitOfWorkFactory,
    PostgresUserOverrideRepository,
};

pub type PostgresAccessService = AccessService<
    PostgresPermissionRepository,
    PostgresRolePermissionRepository,
    PostgresUserOverrideRepository,
>;

pub type InMemoryAccessService =
    AccessService<InMemoryAccessStore, InMemoryAccessStore, InMemoryAccessStore>;

/// Query and command handlers over the same store
pub struct AccessService<P, RP, UO>
where
    P: PermissionRepository,
    RP: RolePermissionRepository,
    UO: UserOverrideRepository,
{
    pub queries: PermissionQueryHandler<P, RP, UO>,
    pub commands: PermissionCommandHandler,
}

impl PostgresAccessService {
    pub fn postgres(pool: PgPool, config: &AccessConfig) -> Self {
        let mut uow_factory = PostgresUnitOfWorkFactory::new(pool.clone())
            .with_scope_locks(config.lock_replacements);
        if config.serializable_saves {
            uow_factory = uow_factory.with_options(TransactionOptions::new().serializable());
        }

        Self {
            queries: PermissionQueryHandler::new(
                Arc::new(PostgresPermissionRepository::new(pool.clone())),
                Arc::new(PostgresRolePermissionRepository::new(pool.clone())),
                Arc::new(PostgresUserOverrideRepository::new(pool)),
            ),
            commands: PermissionCommandHandler::new(Arc::new(uow_factory)),
        }
    }
}

impl InMemoryAccessService {
    pub fn in_memory(store: InMemoryAccessStore) -> Self {
        let store = Arc::new(store);

        Self {
            queries: PermissionQueryHandler::new(store.clone(), store.clone(), store.clone()),
            commands: PermissionCommandHandler::new(store),
        }
    }
}
