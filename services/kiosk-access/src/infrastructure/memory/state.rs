//! Table state shared by the in-process store and its units of work

use std::collections::{BTreeMap, BTreeSet};

use kiosk_common::UserId;
use kiosk_errors::{AppError, AppResult};

use crate::domain::permission::{Permission, PermissionId, Role, UserPermissionOverride};

/// The three access tables with the same keys and constraints as the
/// PostgreSQL schema
#[derive(Debug, Clone, Default)]
pub struct AccessState {
    permissions: BTreeMap<PermissionId, Permission>,
    role_permissions: BTreeSet<(Role, PermissionId)>,
    overrides: BTreeMap<(UserId, PermissionId), UserPermissionOverride>,
}

impl AccessState {
    pub fn create_permission(&mut self, permission: &Permission) -> AppResult<()> {
        let duplicate = self.permissions.contains_key(&permission.id)
            || self.permissions.values().any(|p| {
                p.name == permission.name
                    || (p.module == permission.module && p.action == permission.action)
            });
        if duplicate {
            return Err(AppError::conflict(
                "Duplicate entry violates unique constraint",
            ));
        }

        self.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    pub fn permission(&self, id: &PermissionId) -> Option<Permission> {
        self.permissions.get(id).cloned()
    }

    pub fn permission_by_name(&self, name: &str) -> Option<Permission> {
        self.permissions.values().find(|p| p.name == name).cloned()
    }

    pub fn permissions_by_ids(&self, ids: &[PermissionId]) -> Vec<Permission> {
        let ids: BTreeSet<&PermissionId> = ids.iter().collect();
        self.sorted(|p| ids.contains(&p.id))
    }

    /// Ordered by module, then action
    pub fn all_permissions(&self) -> Vec<Permission> {
        self.sorted(|_| true)
    }

    pub fn module_permissions(&self, module: &str) -> Vec<Permission> {
        self.sorted(|p| p.module == module)
    }

    pub fn role_permissions(&self, role: Role) -> Vec<PermissionId> {
        let granted: BTreeSet<PermissionId> = self
            .role_permissions
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, id)| *id)
            .collect();
        self.sorted(|p| granted.contains(&p.id))
            .into_iter()
            .map(|p| p.id)
            .collect()
    }

    pub fn role_has_permission(&self, role: Role, permission_id: &PermissionId) -> bool {
        self.role_permissions.contains(&(role, *permission_id))
    }

    pub fn replace_role_permissions(
        &mut self,
        role: Role,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        self.ensure_known(permission_ids.iter())?;
        self.role_permissions.retain(|(r, _)| *r != role);
        self.role_permissions
            .extend(permission_ids.iter().map(|id| (role, *id)));
        Ok(())
    }

    pub fn user_overrides(&self, user_id: &UserId) -> Vec<UserPermissionOverride> {
        let rows: BTreeMap<PermissionId, &UserPermissionOverride> = self
            .overrides
            .values()
            .filter(|o| &o.user_id == user_id)
            .map(|o| (o.permission_id, o))
            .collect();
        self.sorted(|p| rows.contains_key(&p.id))
            .into_iter()
            .filter_map(|p| rows.get(&p.id).map(|o| (*o).clone()))
            .collect()
    }

    pub fn user_override(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Option<UserPermissionOverride> {
        self.overrides
            .get(&(user_id.clone(), *permission_id))
            .cloned()
    }

    pub fn insert_override(&mut self, entry: &UserPermissionOverride) -> AppResult<()> {
        self.ensure_known(std::iter::once(&entry.permission_id))?;
        let key = (entry.user_id.clone(), entry.permission_id);
        if self.overrides.contains_key(&key) {
            return Err(AppError::conflict(
                "Duplicate entry violates unique constraint",
            ));
        }
        self.overrides.insert(key, entry.clone());
        Ok(())
    }

    pub fn set_override_granted(
        &mut self,
        user_id: &UserId,
        permission_id: &PermissionId,
        granted: bool,
    ) -> bool {
        match self.overrides.get_mut(&(user_id.clone(), *permission_id)) {
            Some(row) => {
                row.granted = granted;
                row.updated_at = chrono::Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn delete_override(&mut self, user_id: &UserId, permission_id: &PermissionId) -> bool {
        self.overrides
            .remove(&(user_id.clone(), *permission_id))
            .is_some()
    }

    pub fn replace_user_overrides(
        &mut self,
        user_id: &UserId,
        entries: &[UserPermissionOverride],
    ) -> AppResult<()> {
        self.ensure_known(entries.iter().map(|e| &e.permission_id))?;
        self.overrides.retain(|(u, _), _| u != user_id);
        for entry in entries {
            let mut row = entry.clone();
            row.user_id = user_id.clone();
            self.overrides.insert((user_id.clone(), row.permission_id), row);
        }
        Ok(())
    }

    fn ensure_known<'a>(&self, mut ids: impl Iterator<Item = &'a PermissionId>) -> AppResult<()> {
        if ids.all(|id| self.permissions.contains_key(id)) {
            Ok(())
        } else {
            Err(AppError::validation("Foreign key constraint violation"))
        }
    }

    fn sorted(&self, keep: impl Fn(&Permission) -> bool) -> Vec<Permission> {
        let mut permissions: Vec<Permission> = self
            .permissions
            .values()
            .filter(|p| keep(p))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| (&a.module, &a.action).cmp(&(&b.module, &b.action)));
        permissions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(names: &[(&str, &str)]) -> (AccessState, Vec<PermissionId>) {
        let mut state = AccessState::default();
        let ids = names
            .iter()
            .map(|(module, action)| {
                let p = Permission::new(module, action, "");
                state.create_permission(&p).unwrap();
                p.id
            })
            .collect();
        (state, ids)
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let (mut state, _) = state_with(&[("sales", "view")]);
        let err = state
            .create_permission(&Permission::new("sales", "view", "again"))
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_role_permissions_are_scoped_to_role() {
        let (mut state, ids) = state_with(&[("sales", "view"), ("lunch", "view")]);
        state
            .replace_role_permissions(Role::Cashier, &ids[..1])
            .unwrap();
        state
            .replace_role_permissions(Role::Kitchen, &ids[1..])
            .unwrap();

        assert_eq!(state.role_permissions(Role::Cashier), vec![ids[0]]);
        assert_eq!(state.role_permissions(Role::Kitchen), vec![ids[1]]);
        assert!(!state.role_has_permission(Role::Cashier, &ids[1]));
    }

    #[test]
    fn test_unknown_permission_is_rejected_without_changes() {
        let (mut state, ids) = state_with(&[("sales", "view")]);
        state.replace_role_permissions(Role::Parent, &ids).unwrap();

        let err = state
            .replace_role_permissions(Role::Parent, &[PermissionId::new()])
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(state.role_permissions(Role::Parent), ids);
    }

    #[test]
    fn test_override_row_lifecycle() {
        let (mut state, ids) = state_with(&[("billing", "view")]);
        let user = UserId::new();
        let row = UserPermissionOverride::new(user.clone(), ids[0], true);

        state.insert_override(&row).unwrap();
        assert!(matches!(
            state.insert_override(&row),
            Err(AppError::Conflict(_))
        ));
        assert!(state.set_override_granted(&user, &ids[0], false));
        assert_eq!(state.user_override(&user, &ids[0]).map(|o| o.granted), Some(false));
        assert!(state.delete_override(&user, &ids[0]));
        assert!(!state.delete_override(&user, &ids[0]));
        assert!(state.user_overrides(&user).is_empty());
    }
}
