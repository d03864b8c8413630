//! Schema migrations for the access tables

use kiosk_adapter_postgres::Migration;

const CREATE_PERMISSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS permissions (
    id UUID PRIMARY KEY,
    module VARCHAR(64) NOT NULL,
    action VARCHAR(64) NOT NULL,
    name VARCHAR(129) NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (module, action)
);

CREATE INDEX IF NOT EXISTS idx_permissions_module ON permissions (module);
"#;

const CREATE_ROLE_PERMISSIONS: &str = r#"
CREATE TABLE IF NOT EXISTS role_permissions (
    role VARCHAR(32) NOT NULL CHECK (role IN (
        'network_supervisor', 'unit_manager', 'cashier', 'kitchen', 'parent', 'general_admin'
    )),
    permission_id UUID NOT NULL REFERENCES permissions (id) ON DELETE CASCADE,
    granted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (role, permission_id)
);
"#;

const CREATE_USER_OVERRIDES: &str = r#"
CREATE TABLE IF NOT EXISTS user_permission_overrides (
    user_id UUID NOT NULL,
    permission_id UUID NOT NULL REFERENCES permissions (id) ON DELETE CASCADE,
    granted BOOLEAN NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, permission_id)
);

CREATE INDEX IF NOT EXISTS idx_user_permission_overrides_permission
    ON user_permission_overrides (permission_id);
"#;

/// Migrations in version order
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(1, "create_permissions", CREATE_PERMISSIONS),
        Migration::new(2, "create_role_permissions", CREATE_ROLE_PERMISSIONS),
        Migration::new(3, "create_user_permission_overrides", CREATE_USER_OVERRIDES),
    ]
}
