//! Unit of Work
//!
//! Coordinates the permission repositories inside one transaction so a
//! replace-all save either fully commits or leaves storage untouched.

use async_trait::async_trait;
use kiosk_common::UserId;
use kiosk_errors::AppResult;

use crate::domain::permission::{
    PermissionRepository, Role, RolePermissionRepository, UserOverrideRepository,
};

/// Scope a save writes to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SaveScope {
    Role(Role),
    User(UserId),
    Catalog,
}

impl SaveScope {
    /// Key for the transaction-scoped lock serializing saves of one scope
    pub fn lock_key(&self) -> String {
        format!("kiosk_access:{}", self)
    }

    /// Metric label
    pub fn kind(&self) -> &'static str {
        match self {
            SaveScope::Role(_) => "role",
            SaveScope::User(_) => "user",
            SaveScope::Catalog => "catalog",
        }
    }
}

impl std::fmt::Display for SaveScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveScope::Role(role) => write!(f, "role:{}", role),
            SaveScope::User(user_id) => write!(f, "user:{}", user_id),
            SaveScope::Catalog => f.write_str("catalog"),
        }
    }
}

/// Unit of Work trait
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn permissions(&self) -> &dyn PermissionRepository;

    fn role_permissions(&self) -> &dyn RolePermissionRepository;

    fn user_overrides(&self) -> &dyn UserOverrideRepository;

    /// Block concurrent units of work writing the same scope until this one ends
    async fn lock_scope(&self, scope: &SaveScope) -> AppResult<()>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work factory
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_keys() {
        assert_eq!(
            SaveScope::Role(Role::Cashier).lock_key(),
            "kiosk_access:role:cashier"
        );
        let user_id = UserId::new();
        assert_eq!(
            SaveScope::User(user_id.clone()).lock_key(),
            format!("kiosk_access:user:{}", user_id)
        );
        assert_eq!(SaveScope::Catalog.kind(), "catalog");
    }
}
