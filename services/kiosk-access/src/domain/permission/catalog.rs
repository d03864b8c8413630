//! Default kiosk permission catalog

use super::permission::Permission;
use super::role::Role;

#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub module: &'static str,
    pub action: &'static str,
    pub description: &'static str,
}

impl CatalogEntry {
    const fn new(module: &'static str, action: &'static str, description: &'static str) -> Self {
        Self {
            module,
            action,
            description,
        }
    }

    pub fn name(&self) -> String {
        Permission::generate_name(self.module, self.action)
    }

    pub fn to_permission(&self) -> Permission {
        Permission::new(self.module, self.action, self.description)
    }
}

pub const DEFAULT_CATALOG: &[CatalogEntry] = &[
    CatalogEntry::new("sales", "create", "Ring up a sale at the point of sale"),
    CatalogEntry::new("sales", "view", "See sales and tickets"),
    CatalogEntry::new("sales", "delete", "Void a completed sale"),
    CatalogEntry::new("sales", "refund", "Refund a sale to the student balance"),
    CatalogEntry::new("cash_register", "open", "Open a cash register shift"),
    CatalogEntry::new("cash_register", "close", "Close a shift and declare cash"),
    CatalogEntry::new("cash_register", "view_history", "See past closures and differences"),
    CatalogEntry::new("lunch", "order", "Order lunches for a student"),
    CatalogEntry::new("lunch", "view", "See lunch orders"),
    CatalogEntry::new("lunch", "manage_menu", "Edit the lunch menu"),
    CatalogEntry::new("billing", "view", "See balances, debts and invoices"),
    CatalogEntry::new("billing", "charge", "Record payments and recharges"),
    CatalogEntry::new("billing", "export", "Export billing reports"),
    CatalogEntry::new("logistics", "request_supply", "Request supplies for a unit"),
    CatalogEntry::new("logistics", "approve_supply", "Approve and dispatch supply requests"),
    CatalogEntry::new("logistics", "view_stock", "See stock levels"),
    CatalogEntry::new("students", "view", "See student records"),
    CatalogEntry::new("students", "manage", "Create and edit students"),
    CatalogEntry::new("students", "link_parent", "Link parents to students"),
    CatalogEntry::new("reports", "view", "See dashboards"),
    CatalogEntry::new("reports", "export", "Export dashboards"),
    CatalogEntry::new("admin", "manage_users", "Create users and assign roles"),
    CatalogEntry::new("admin", "manage_permissions", "Edit role and user permissions"),
];

/// Names granted to `role` when the catalog is first created
pub fn default_role_grants(role: Role) -> Vec<String> {
    let names: &[&str] = match role {
        Role::GeneralAdmin => return DEFAULT_CATALOG.iter().map(CatalogEntry::name).collect(),
        Role::NetworkSupervisor => &[
            "sales.view",
            "cash_register.view_history",
            "lunch.view",
            "billing.view",
            "billing.export",
            "logistics.approve_supply",
            "logistics.view_stock",
            "students.view",
            "reports.view",
            "reports.export",
        ],
        Role::UnitManager => &[
            "sales.create",
            "sales.view",
            "sales.delete",
            "sales.refund",
            "cash_register.open",
            "cash_register.close",
            "cash_register.view_history",
            "lunch.order",
            "lunch.view",
            "lunch.manage_menu",
            "billing.view",
            "billing.charge",
            "logistics.request_supply",
            "logistics.view_stock",
            "students.view",
            "students.manage",
            "students.link_parent",
            "reports.view",
        ],
        Role::Cashier => &[
            "sales.create",
            "sales.view",
            "cash_register.open",
            "cash_register.close",
            "lunch.view",
            "billing.charge",
            "students.view",
        ],
        Role::Kitchen => &[
            "lunch.view",
            "lunch.manage_menu",
            "logistics.request_supply",
            "logistics.view_stock",
        ],
        Role::Parent => &["lunch.order", "lunch.view", "billing.view", "students.view"],
    };
    names.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let names: HashSet<String> = DEFAULT_CATALOG.iter().map(CatalogEntry::name).collect();
        assert_eq!(names.len(), DEFAULT_CATALOG.len());
    }

    #[test]
    fn test_default_grants_reference_catalog() {
        let names: HashSet<String> = DEFAULT_CATALOG.iter().map(CatalogEntry::name).collect();
        for role in Role::ALL {
            for grant in default_role_grants(role) {
                assert!(names.contains(&grant), "{} grants unknown {}", role, grant);
            }
        }
    }

    #[test]
    fn test_only_general_admin_manages_permissions() {
        for role in Role::ALL {
            let grants = default_role_grants(role);
            assert_eq!(
                grants.iter().any(|g| g == "admin.manage_permissions"),
                role == Role::GeneralAdmin
            );
        }
    }
}
