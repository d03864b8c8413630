//! PostgreSQL role default grants

use async_trait::async_trait;
use kiosk_errors::{AppError, AppResult};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::db_metrics::QueryTimer;
use super::error_mapper::map_sqlx_error;
use crate::domain::permission::{PermissionId, Role, RolePermissionRepository};

pub(crate) async fn fetch_for_role<'e, E: PgExecutor<'e>>(
    executor: E,
    role: Role,
) -> AppResult<Vec<PermissionId>> {
    let timer = QueryTimer::new("role_permissions", "list_for_role");
    let result = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT rp.permission_id
        FROM role_permissions rp
        INNER JOIN permissions p ON p.id = rp.permission_id
        WHERE rp.role = $1
        ORDER BY p.module, p.action
        "#,
    )
    .bind(role.as_str())
    .fetch_all(executor)
    .await;
    timer.observe(&result);

    Ok(result
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(PermissionId::from_uuid)
        .collect())
}

pub(crate) async fn exists<'e, E: PgExecutor<'e>>(
    executor: E,
    role: Role,
    permission_id: &PermissionId,
) -> AppResult<bool> {
    let timer = QueryTimer::new("role_permissions", "role_has_permission");
    let result = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM role_permissions WHERE role = $1 AND permission_id = $2)",
    )
    .bind(role.as_str())
    .bind(permission_id.0)
    .fetch_one(executor)
    .await;
    timer.observe(&result);

    result.map_err(map_sqlx_error)
}

/// Delete-then-insert on one connection; the caller owns the transaction
pub(crate) async fn replace(
    conn: &mut PgConnection,
    role: Role,
    permission_ids: &[PermissionId],
) -> AppResult<()> {
    let timer = QueryTimer::new("role_permissions", "delete_for_role");
    let result = sqlx::query("DELETE FROM role_permissions WHERE role = $1")
        .bind(role.as_str())
        .execute(&mut *conn)
        .await;
    timer.observe(&result);
    result.map_err(map_sqlx_error)?;

    if permission_ids.is_empty() {
        return Ok(());
    }

    let uuids: Vec<Uuid> = permission_ids.iter().map(|id| id.0).collect();
    let timer = QueryTimer::new("role_permissions", "insert_for_role");
    let result = sqlx::query(
        r#"
        INSERT INTO role_permissions (role, permission_id, granted_at)
        SELECT $1, permission_id, NOW()
        FROM UNNEST($2::uuid[]) AS t(permission_id)
        ON CONFLICT (role, permission_id) DO NOTHING
        "#,
    )
    .bind(role.as_str())
    .bind(&uuids)
    .execute(&mut *conn)
    .await;
    timer.observe(&result);
    result.map_err(map_sqlx_error)?;

    Ok(())
}

pub struct PostgresRolePermissionRepository {
    pool: PgPool,
}

impl PostgresRolePermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RolePermissionRepository for PostgresRolePermissionRepository {
    async fn list_for_role(&self, role: Role) -> AppResult<Vec<PermissionId>> {
        fetch_for_role(&self.pool, role).await
    }

    async fn role_has_permission(
        &self,
        role: Role,
        permission_id: &PermissionId,
    ) -> AppResult<bool> {
        exists(&self.pool, role, permission_id).await
    }

    async fn replace_for_role(&self, role: Role, permission_ids: &[PermissionId]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        replace(&mut tx, role, permission_ids).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))
    }
}
