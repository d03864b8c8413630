//! Per-user permission overrides

use chrono::{DateTime, Utc};
use kiosk_common::UserId;
use serde::{Deserialize, Serialize};

use super::permission::PermissionId;

/// Three-state override of a role default
///
/// Stored as row presence plus a `granted` flag: `Granted` is a row with
/// `granted = true`, `Revoked` a row with `granted = false`, `Inherited`
/// no row at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideState {
    #[default]
    Inherited,
    Granted,
    Revoked,
}

impl OverrideState {
    /// Editor cycle: inherited -> granted -> revoked -> inherited
    pub fn next(self) -> Self {
        match self {
            OverrideState::Inherited => OverrideState::Granted,
            OverrideState::Granted => OverrideState::Revoked,
            OverrideState::Revoked => OverrideState::Inherited,
        }
    }

    pub fn from_granted(granted: Option<bool>) -> Self {
        match granted {
            None => OverrideState::Inherited,
            Some(true) => OverrideState::Granted,
            Some(false) => OverrideState::Revoked,
        }
    }

    /// Stored flag; `None` means no row
    pub fn granted(self) -> Option<bool> {
        match self {
            OverrideState::Inherited => None,
            OverrideState::Granted => Some(true),
            OverrideState::Revoked => Some(false),
        }
    }

    pub fn is_inherited(self) -> bool {
        self == OverrideState::Inherited
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideState::Inherited => "inherited",
            OverrideState::Granted => "granted",
            OverrideState::Revoked => "revoked",
        }
    }

    /// Row operation that moves storage from `self` to `target`
    pub fn transition_to(self, target: OverrideState) -> Option<OverrideChange> {
        match (self.granted(), target.granted()) {
            (None, None) => None,
            (Some(_), None) => Some(OverrideChange::Delete),
            (None, Some(granted)) => Some(OverrideChange::Insert { granted }),
            (Some(current), Some(granted)) if current != granted => {
                Some(OverrideChange::Update { granted })
            }
            (Some(_), Some(_)) => None,
        }
    }
}

impl std::fmt::Display for OverrideState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage change for one `(user, permission)` override row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideChange {
    Insert { granted: bool },
    Update { granted: bool },
    Delete,
}

/// Override row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPermissionOverride {
    pub user_id: UserId,
    pub permission_id: PermissionId,
    pub granted: bool,
    pub updated_at: DateTime<Utc>,
}

impl UserPermissionOverride {
    pub fn new(user_id: UserId, permission_id: PermissionId, granted: bool) -> Self {
        Self {
            user_id,
            permission_id,
            granted,
            updated_at: Utc::now(),
        }
    }

    /// Row for a non-inherited state, `None` for `Inherited`
    pub fn from_state(
        user_id: UserId,
        permission_id: PermissionId,
        state: OverrideState,
    ) -> Option<Self> {
        state
            .granted()
            .map(|granted| Self::new(user_id, permission_id, granted))
    }

    pub fn state(&self) -> OverrideState {
        OverrideState::from_granted(Some(self.granted))
    }
}
