//! Editor drafts
//!
//! Per-view state of the role and user permission editors. A draft is
//! edited locally and turned into one replace-save; nothing is written
//! while toggling.

use std::collections::{BTreeMap, BTreeSet};

use kiosk_common::UserId;

use super::override_state::{OverrideState, UserPermissionOverride};
use super::permission::PermissionId;
use super::role::Role;

/// Checkbox state of the role permissions editor
#[derive(Debug, Clone)]
pub struct RolePermissionDraft {
    role: Role,
    original: BTreeSet<PermissionId>,
    checked: BTreeSet<PermissionId>,
}

impl RolePermissionDraft {
    pub fn new(role: Role, current: impl IntoIterator<Item = PermissionId>) -> Self {
        let original: BTreeSet<PermissionId> = current.into_iter().collect();
        Self {
            role,
            checked: original.clone(),
            original,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_checked(&self, permission_id: &PermissionId) -> bool {
        self.checked.contains(permission_id)
    }

    /// Flip one checkbox, returns the new value
    pub fn toggle(&mut self, permission_id: PermissionId) -> bool {
        if !self.checked.remove(&permission_id) {
            self.checked.insert(permission_id);
            true
        } else {
            false
        }
    }

    /// Check or uncheck a whole group (e.g. every action of a module)
    pub fn set_all(&mut self, permission_ids: impl IntoIterator<Item = PermissionId>, checked: bool) {
        for id in permission_ids {
            if checked {
                self.checked.insert(id);
            } else {
                self.checked.remove(&id);
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.checked != self.original
    }

    pub fn checked(&self) -> &BTreeSet<PermissionId> {
        &self.checked
    }

    pub fn into_parts(self) -> (Role, BTreeSet<PermissionId>) {
        (self.role, self.checked)
    }
}

/// Three-state cells of the user permissions editor
#[derive(Debug, Clone)]
pub struct UserOverrideDraft {
    user_id: UserId,
    original: BTreeMap<PermissionId, OverrideState>,
    states: BTreeMap<PermissionId, OverrideState>,
}

impl UserOverrideDraft {
    pub fn new(user_id: UserId, overrides: impl IntoIterator<Item = UserPermissionOverride>) -> Self {
        let original: BTreeMap<PermissionId, OverrideState> = overrides
            .into_iter()
            .map(|o| (o.permission_id, o.state()))
            .collect();
        Self {
            user_id,
            states: original.clone(),
            original,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn state(&self, permission_id: &PermissionId) -> OverrideState {
        self.states.get(permission_id).copied().unwrap_or_default()
    }

    /// Advance one cell through the cycle, returns the new state
    pub fn cycle(&mut self, permission_id: PermissionId) -> OverrideState {
        let next = self.state(&permission_id).next();
        self.set(permission_id, next);
        next
    }

    pub fn set(&mut self, permission_id: PermissionId, state: OverrideState) {
        if state.is_inherited() {
            self.states.remove(&permission_id);
        } else {
            self.states.insert(permission_id, state);
        }
    }

    /// Drop every override, back to the plain role defaults
    pub fn reset(&mut self) {
        self.states.clear();
    }

    pub fn is_dirty(&self) -> bool {
        self.states != self.original
    }

    /// Non-inherited cells only
    pub fn entries(&self) -> &BTreeMap<PermissionId, OverrideState> {
        &self.states
    }

    pub fn into_parts(self) -> (UserId, BTreeMap<PermissionId, OverrideState>) {
        (self.user_id, self.states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_draft_toggle() {
        let view = PermissionId::new();
        let create = PermissionId::new();
        let mut draft = RolePermissionDraft::new(Role::Cashier, [view]);

        assert!(!draft.is_dirty());
        assert!(draft.toggle(create));
        assert!(!draft.toggle(view));
        assert!(draft.is_dirty());

        let (role, checked) = draft.into_parts();
        assert_eq!(role, Role::Cashier);
        assert_eq!(checked, BTreeSet::from([create]));
    }

    #[test]
    fn test_role_draft_toggle_back_is_clean() {
        let view = PermissionId::new();
        let mut draft = RolePermissionDraft::new(Role::Kitchen, [view]);

        draft.toggle(view);
        draft.toggle(view);
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_role_draft_set_all() {
        let ids = [PermissionId::new(), PermissionId::new()];
        let mut draft = RolePermissionDraft::new(Role::UnitManager, []);

        draft.set_all(ids, true);
        assert_eq!(draft.checked().len(), 2);
        draft.set_all(ids, false);
        assert!(draft.checked().is_empty());
    }

    #[test]
    fn test_user_draft_cycle_three_times() {
        let perm = PermissionId::new();
        let mut draft = UserOverrideDraft::new(UserId::new(), []);

        assert_eq!(draft.cycle(perm), OverrideState::Granted);
        assert_eq!(draft.cycle(perm), OverrideState::Revoked);
        assert_eq!(draft.cycle(perm), OverrideState::Inherited);
        assert!(draft.entries().is_empty());
        assert!(!draft.is_dirty());
    }

    #[test]
    fn test_user_draft_starts_from_rows() {
        let user = UserId::new();
        let perm = PermissionId::new();
        let mut draft =
            UserOverrideDraft::new(user.clone(), [UserPermissionOverride::new(user, perm, false)]);

        assert_eq!(draft.state(&perm), OverrideState::Revoked);
        draft.reset();
        assert_eq!(draft.state(&perm), OverrideState::Inherited);
        assert!(draft.is_dirty());
    }
}
