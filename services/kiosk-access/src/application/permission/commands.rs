//! Permission write commands

use std::collections::{BTreeMap, BTreeSet};

use kiosk_common::UserId;

use crate::domain::permission::{
    OverrideState, PermissionId, Role, RolePermissionDraft, UserOverrideDraft,
    UserPermissionOverride,
};

/// Replace every default grant of a role
#[derive(Debug, Clone)]
pub struct SaveRolePermissionsCommand {
    pub role: Role,
    pub permission_ids: BTreeSet<PermissionId>,
    /// Acting user (audit)
    pub performed_by: Option<UserId>,
}

impl SaveRolePermissionsCommand {
    pub fn new(role: Role, permission_ids: impl IntoIterator<Item = PermissionId>) -> Self {
        Self {
            role,
            permission_ids: permission_ids.into_iter().collect(),
            performed_by: None,
        }
    }

    pub fn from_draft(draft: RolePermissionDraft, performed_by: Option<UserId>) -> Self {
        let (role, permission_ids) = draft.into_parts();
        Self {
            role,
            permission_ids,
            performed_by,
        }
    }

    pub fn permission_ids(&self) -> Vec<PermissionId> {
        self.permission_ids.iter().copied().collect()
    }
}

/// Replace every override of a user
#[derive(Debug, Clone)]
pub struct SaveUserOverridesCommand {
    pub user_id: UserId,
    pub overrides: BTreeMap<PermissionId, OverrideState>,
    pub performed_by: Option<UserId>,
}

impl SaveUserOverridesCommand {
    pub fn new(
        user_id: UserId,
        overrides: impl IntoIterator<Item = (PermissionId, OverrideState)>,
    ) -> Self {
        Self {
            user_id,
            overrides: overrides.into_iter().collect(),
            performed_by: None,
        }
    }

    pub fn from_draft(draft: UserOverrideDraft, performed_by: Option<UserId>) -> Self {
        let (user_id, overrides) = draft.into_parts();
        Self {
            user_id,
            overrides,
            performed_by,
        }
    }

    /// Rows to store; `Inherited` entries have none
    pub fn persisted_entries(&self) -> Vec<UserPermissionOverride> {
        self.overrides
            .iter()
            .filter_map(|(permission_id, state)| {
                UserPermissionOverride::from_state(self.user_id.clone(), *permission_id, *state)
            })
            .collect()
    }
}

/// Advance one override along inherited -> granted -> revoked -> inherited
#[derive(Debug, Clone)]
pub struct CycleUserOverrideCommand {
    pub user_id: UserId,
    pub permission_id: PermissionId,
    /// State the caller last saw
    pub current: OverrideState,
    pub performed_by: Option<UserId>,
}

impl CycleUserOverrideCommand {
    pub fn new(user_id: UserId, permission_id: PermissionId, current: OverrideState) -> Self {
        Self {
            user_id,
            permission_id,
            current,
            performed_by: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherited_entries_are_not_persisted() {
        let user_id = UserId::new();
        let granted = PermissionId::new();
        let revoked = PermissionId::new();
        let inherited = PermissionId::new();

        let cmd = SaveUserOverridesCommand::new(
            user_id.clone(),
            [
                (granted, OverrideState::Granted),
                (revoked, OverrideState::Revoked),
                (inherited, OverrideState::Inherited),
            ],
        );

        let entries = cmd.persisted_entries();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.user_id == user_id));
        assert!(entries.iter().all(|e| e.permission_id != inherited));
        assert!(
            entries
                .iter()
                .any(|e| e.permission_id == revoked && !e.granted)
        );
    }

    #[test]
    fn test_role_command_from_draft() {
        let a = PermissionId::new();
        let b = PermissionId::new();
        let mut draft = RolePermissionDraft::new(Role::Kitchen, [a]);
        draft.toggle(a);
        draft.toggle(b);

        let cmd = SaveRolePermissionsCommand::from_draft(draft, None);
        assert_eq!(cmd.role, Role::Kitchen);
        assert_eq!(cmd.permission_ids(), vec![b]);
    }
}
