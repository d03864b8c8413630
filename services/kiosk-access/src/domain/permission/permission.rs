//! Permission entity

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionId(pub Uuid);

impl PermissionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PermissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PermissionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Permission entity
///
/// One grantable capability, e.g. `sales.delete`. Immutable once roles or
/// users reference it: the catalog only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    /// Grouping label (e.g. "sales", "lunch")
    pub module: String,
    /// Verb (e.g. "view", "delete")
    pub action: String,
    /// Unique machine key, `module.action`
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    pub fn new(module: &str, action: &str, description: impl Into<String>) -> Self {
        Self {
            id: PermissionId::new(),
            module: module.to_string(),
            action: action.to_string(),
            name: Self::generate_name(module, action),
            description: description.into(),
            created_at: Utc::now(),
        }
    }

    pub fn generate_name(module: &str, action: &str) -> String {
        format!("{}.{}", module, action)
    }

    /// Split `module.action`; the action is everything after the first dot
    pub fn split_name(name: &str) -> Option<(&str, &str)> {
        name.split_once('.')
            .filter(|(module, action)| !module.is_empty() && !action.is_empty())
    }
}

impl PartialEq for Permission {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Permission {}

/// Group permissions by module, actions sorted within each module
pub fn group_by_module(
    permissions: impl IntoIterator<Item = Permission>,
) -> BTreeMap<String, Vec<Permission>> {
    let mut groups: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
    for permission in permissions {
        groups
            .entry(permission.module.clone())
            .or_default()
            .push(permission);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| a.action.cmp(&b.action));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_permission() {
        let perm = Permission::new("sales", "delete", "Void a completed sale");

        assert_eq!(perm.name, "sales.delete");
        assert_eq!(perm.module, "sales");
        assert_eq!(perm.action, "delete");
    }

    #[test]
    fn test_split_name() {
        assert_eq!(Permission::split_name("sales.view"), Some(("sales", "view")));
        assert_eq!(
            Permission::split_name("cash_register.view.history"),
            Some(("cash_register", "view.history"))
        );
        assert_eq!(Permission::split_name("sales"), None);
        assert_eq!(Permission::split_name(".view"), None);
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = Permission::new("sales", "view", "");
        let mut b = a.clone();
        b.description = "changed".to_string();
        assert_eq!(a, b);
        assert_ne!(a, Permission::new("sales", "view", ""));
    }

    #[test]
    fn test_group_by_module() {
        let groups = group_by_module(vec![
            Permission::new("sales", "view", ""),
            Permission::new("lunch", "order", ""),
            Permission::new("sales", "create", ""),
        ]);

        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["lunch", "sales"]);
        let sales: Vec<&str> = groups["sales"].iter().map(|p| p.action.as_str()).collect();
        assert_eq!(sales, vec!["create", "view"]);
    }
}
