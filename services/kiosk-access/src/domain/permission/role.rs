//! System roles

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

/// Closed set of actor kinds; each has a default permission set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    NetworkSupervisor,
    UnitManager,
    Cashier,
    Kitchen,
    Parent,
    GeneralAdmin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::NetworkSupervisor,
        Role::UnitManager,
        Role::Cashier,
        Role::Kitchen,
        Role::Parent,
        Role::GeneralAdmin,
    ];

    /// Stored tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::NetworkSupervisor => "network_supervisor",
            Role::UnitManager => "unit_manager",
            Role::Cashier => "cashier",
            Role::Kitchen => "kitchen",
            Role::Parent => "parent",
            Role::GeneralAdmin => "general_admin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::NetworkSupervisor => "Network Supervisor",
            Role::UnitManager => "Unit Manager",
            Role::Cashier => "Cashier",
            Role::Kitchen => "Kitchen Staff",
            Role::Parent => "Parent",
            Role::GeneralAdmin => "General Admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(
            "janitor".parse::<Role>(),
            Err(UnknownRole("janitor".to_string()))
        );
        // tags are case-sensitive
        assert!("Cashier".parse::<Role>().is_err());
    }

    #[test]
    fn test_serde_uses_tag() {
        let json = serde_json::to_string(&Role::GeneralAdmin).unwrap();
        assert_eq!(json, "\"general_admin\"");
    }
}
