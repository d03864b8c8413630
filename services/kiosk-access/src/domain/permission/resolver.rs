//! Effective permission resolution
//!
//! A user's override row always wins; without one the role default applies.
//! Roles never inherit from other roles.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::override_state::{OverrideState, UserPermissionOverride};
use super::permission::PermissionId;
use super::role::Role;

/// Where a decision came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    /// Explicit per-user grant
    UserGrant,
    /// Explicit per-user revoke
    UserRevoke,
    /// Role default
    Role,
    /// Neither an override nor a role grant
    DefaultDeny,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::UserGrant => "USER_GRANT",
            DecisionSource::UserRevoke => "USER_REVOKE",
            DecisionSource::Role => "ROLE",
            DecisionSource::DefaultDeny => "DEFAULT_DENY",
        }
    }
}

impl std::fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub source: DecisionSource,
}

/// The precedence rule for one `(user, permission)` pair
pub fn resolve(role_has_permission: bool, state: OverrideState) -> Decision {
    match state {
        OverrideState::Granted => Decision {
            allowed: true,
            source: DecisionSource::UserGrant,
        },
        OverrideState::Revoked => Decision {
            allowed: false,
            source: DecisionSource::UserRevoke,
        },
        OverrideState::Inherited if role_has_permission => Decision {
            allowed: true,
            source: DecisionSource::Role,
        },
        OverrideState::Inherited => Decision {
            allowed: false,
            source: DecisionSource::DefaultDeny,
        },
    }
}

/// Resolved snapshot of one user's permissions
///
/// Built from a single load of the role grants and the user's overrides,
/// then answers any number of checks without further I/O.
#[derive(Debug, Clone)]
pub struct EffectivePermissions {
    role: Role,
    role_grants: HashSet<PermissionId>,
    overrides: HashMap<PermissionId, bool>,
}

impl EffectivePermissions {
    pub fn new(
        role: Role,
        role_grants: impl IntoIterator<Item = PermissionId>,
        overrides: impl IntoIterator<Item = UserPermissionOverride>,
    ) -> Self {
        Self {
            role,
            role_grants: role_grants.into_iter().collect(),
            overrides: overrides
                .into_iter()
                .map(|o| (o.permission_id, o.granted))
                .collect(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn role_has_permission(&self, permission_id: &PermissionId) -> bool {
        self.role_grants.contains(permission_id)
    }

    pub fn override_state(&self, permission_id: &PermissionId) -> OverrideState {
        OverrideState::from_granted(self.overrides.get(permission_id).copied())
    }

    pub fn decide(&self, permission_id: &PermissionId) -> Decision {
        resolve(
            self.role_has_permission(permission_id),
            self.override_state(permission_id),
        )
    }

    pub fn allows(&self, permission_id: &PermissionId) -> bool {
        self.decide(permission_id).allowed
    }

    /// Every permission the user effectively holds
    pub fn granted(&self) -> BTreeSet<PermissionId> {
        self.role_grants
            .iter()
            .chain(self.overrides.keys())
            .filter(|id| self.allows(id))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiosk_common::UserId;

    #[test]
    fn test_resolve_table() {
        use OverrideState::*;

        assert_eq!(resolve(true, Inherited).source, DecisionSource::Role);
        assert!(resolve(true, Inherited).allowed);
        assert_eq!(resolve(false, Inherited).source, DecisionSource::DefaultDeny);
        assert!(!resolve(false, Inherited).allowed);

        // overrides win regardless of the role default
        for role_has in [true, false] {
            assert!(resolve(role_has, Granted).allowed);
            assert!(!resolve(role_has, Revoked).allowed);
        }
    }

    #[test]
    fn test_cashier_with_revoked_view() {
        let user = UserId::new();
        let create = PermissionId::new();
        let view = PermissionId::new();

        let effective = EffectivePermissions::new(
            Role::Cashier,
            [create, view],
            [UserPermissionOverride::new(user, view, false)],
        );

        assert!(effective.allows(&create));
        assert!(!effective.allows(&view));
        assert_eq!(effective.decide(&view).source, DecisionSource::UserRevoke);
        assert_eq!(effective.override_state(&create), OverrideState::Inherited);
    }

    #[test]
    fn test_granted_set_merges_overrides() {
        let user = UserId::new();
        let role_only = PermissionId::new();
        let revoked = PermissionId::new();
        let extra = PermissionId::new();

        let effective = EffectivePermissions::new(
            Role::Kitchen,
            [role_only, revoked],
            [
                UserPermissionOverride::new(user.clone(), revoked, false),
                UserPermissionOverride::new(user, extra, true),
            ],
        );

        let granted = effective.granted();
        assert!(granted.contains(&role_only));
        assert!(granted.contains(&extra));
        assert!(!granted.contains(&revoked));
        assert_eq!(granted.len(), 2);
    }
}
