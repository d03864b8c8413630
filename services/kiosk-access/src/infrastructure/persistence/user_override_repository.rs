//! PostgreSQL per-user overrides

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiosk_common::UserId;
use kiosk_errors::{AppError, AppResult};
use sqlx::{PgConnection, PgExecutor, PgPool};
use uuid::Uuid;

use super::db_metrics::QueryTimer;
use super::error_mapper::map_sqlx_error;
use crate::domain::permission::{PermissionId, UserOverrideRepository, UserPermissionOverride};

#[derive(sqlx::FromRow)]
struct OverrideRow {
    user_id: Uuid,
    permission_id: Uuid,
    granted: bool,
    updated_at: DateTime<Utc>,
}

impl From<OverrideRow> for UserPermissionOverride {
    fn from(row: OverrideRow) -> Self {
        UserPermissionOverride {
            user_id: UserId::from_uuid(row.user_id),
            permission_id: PermissionId::from_uuid(row.permission_id),
            granted: row.granted,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) async fn fetch_for_user<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: &UserId,
) -> AppResult<Vec<UserPermissionOverride>> {
    let timer = QueryTimer::new("user_permission_overrides", "list_for_user");
    let result = sqlx::query_as::<_, OverrideRow>(
        r#"
        SELECT o.user_id, o.permission_id, o.granted, o.updated_at
        FROM user_permission_overrides o
        INNER JOIN permissions p ON p.id = o.permission_id
        WHERE o.user_id = $1
        ORDER BY p.module, p.action
        "#,
    )
    .bind(user_id.0)
    .fetch_all(executor)
    .await;
    timer.observe(&result);

    Ok(result
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(Into::into)
        .collect())
}

pub(crate) async fn fetch_one<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: &UserId,
    permission_id: &PermissionId,
) -> AppResult<Option<UserPermissionOverride>> {
    let timer = QueryTimer::new("user_permission_overrides", "find");
    let result = sqlx::query_as::<_, OverrideRow>(
        r#"
        SELECT user_id, permission_id, granted, updated_at
        FROM user_permission_overrides
        WHERE user_id = $1 AND permission_id = $2
        "#,
    )
    .bind(user_id.0)
    .bind(permission_id.0)
    .fetch_optional(executor)
    .await;
    timer.observe(&result);

    Ok(result.map_err(map_sqlx_error)?.map(Into::into))
}

pub(crate) async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    entry: &UserPermissionOverride,
) -> AppResult<()> {
    let timer = QueryTimer::new("user_permission_overrides", "insert");
    let result = sqlx::query(
        r#"
        INSERT INTO user_permission_overrides (user_id, permission_id, granted, updated_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(entry.user_id.0)
    .bind(entry.permission_id.0)
    .bind(entry.granted)
    .bind(entry.updated_at)
    .execute(executor)
    .await;
    timer.observe(&result);

    result.map_err(map_sqlx_error)?;
    Ok(())
}

pub(crate) async fn update_granted<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: &UserId,
    permission_id: &PermissionId,
    granted: bool,
) -> AppResult<bool> {
    let timer = QueryTimer::new("user_permission_overrides", "set_granted");
    let result = sqlx::query(
        r#"
        UPDATE user_permission_overrides
        SET granted = $3, updated_at = NOW()
        WHERE user_id = $1 AND permission_id = $2
        "#,
    )
    .bind(user_id.0)
    .bind(permission_id.0)
    .bind(granted)
    .execute(executor)
    .await;
    timer.observe(&result);

    Ok(result.map_err(map_sqlx_error)?.rows_affected() > 0)
}

pub(crate) async fn remove<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: &UserId,
    permission_id: &PermissionId,
) -> AppResult<bool> {
    let timer = QueryTimer::new("user_permission_overrides", "delete");
    let result = sqlx::query(
        "DELETE FROM user_permission_overrides WHERE user_id = $1 AND permission_id = $2",
    )
    .bind(user_id.0)
    .bind(permission_id.0)
    .execute(executor)
    .await;
    timer.observe(&result);

    Ok(result.map_err(map_sqlx_error)?.rows_affected() > 0)
}

/// Delete-then-insert on one connection; the caller owns the transaction
pub(crate) async fn replace(
    conn: &mut PgConnection,
    user_id: &UserId,
    entries: &[UserPermissionOverride],
) -> AppResult<()> {
    let timer = QueryTimer::new("user_permission_overrides", "delete_for_user");
    let result = sqlx::query("DELETE FROM user_permission_overrides WHERE user_id = $1")
        .bind(user_id.0)
        .execute(&mut *conn)
        .await;
    timer.observe(&result);
    result.map_err(map_sqlx_error)?;

    if entries.is_empty() {
        return Ok(());
    }

    let permission_ids: Vec<Uuid> = entries.iter().map(|e| e.permission_id.0).collect();
    let granted: Vec<bool> = entries.iter().map(|e| e.granted).collect();
    let timer = QueryTimer::new("user_permission_overrides", "insert_for_user");
    let result = sqlx::query(
        r#"
        INSERT INTO user_permission_overrides (user_id, permission_id, granted, updated_at)
        SELECT $1, t.permission_id, t.granted, NOW()
        FROM UNNEST($2::uuid[], $3::bool[]) AS t(permission_id, granted)
        ON CONFLICT (user_id, permission_id) DO UPDATE
        SET granted = EXCLUDED.granted, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(user_id.0)
    .bind(&permission_ids)
    .bind(&granted)
    .execute(&mut *conn)
    .await;
    timer.observe(&result);
    result.map_err(map_sqlx_error)?;

    Ok(())
}

pub struct PostgresUserOverrideRepository {
    pool: PgPool,
}

impl PostgresUserOverrideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserOverrideRepository for PostgresUserOverrideRepository {
    async fn list_for_user(&self, user_id: &UserId) -> AppResult<Vec<UserPermissionOverride>> {
        fetch_for_user(&self.pool, user_id).await
    }

    async fn find(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> AppResult<Option<UserPermissionOverride>> {
        fetch_one(&self.pool, user_id, permission_id).await
    }

    async fn insert(&self, entry: &UserPermissionOverride) -> AppResult<()> {
        insert(&self.pool, entry).await
    }

    async fn set_granted(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        granted: bool,
    ) -> AppResult<bool> {
        update_granted(&self.pool, user_id, permission_id, granted).await
    }

    async fn delete(&self, user_id: &UserId, permission_id: &PermissionId) -> AppResult<bool> {
        remove(&self.pool, user_id, permission_id).await
    }

    async fn replace_for_user(
        &self,
        user_id: &UserId,
        entries: &[UserPermissionOverride],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        replace(&mut tx, user_id, entries).await?;
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))
    }
}
