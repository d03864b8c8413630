//! Permission read queries

use kiosk_common::UserId;

use crate::domain::permission::{PermissionId, Role};
use crate::error::AccessResult;

/// Effective access of one user to one permission
#[derive(Debug, Clone)]
pub struct EffectivePermissionQuery {
    pub user_id: UserId,
    pub role: Role,
    pub permission_id: PermissionId,
}

/// Permission check keyed by machine name, with the role tag from the profile
#[derive(Debug, Clone)]
pub struct CheckPermissionQuery {
    pub user_id: UserId,
    pub role: String,
    /// `module.action`
    pub permission: String,
}

impl CheckPermissionQuery {
    pub fn role(&self) -> AccessResult<Role> {
        Ok(self.role.parse()?)
    }
}

/// Rows of the user-permissions editor
#[derive(Debug, Clone)]
pub struct UserPermissionMatrixQuery {
    pub user_id: UserId,
    pub role: Role,
}
