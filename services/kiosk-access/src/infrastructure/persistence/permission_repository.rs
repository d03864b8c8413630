//! PostgreSQL permission catalog

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiosk_errors::AppResult;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::db_metrics::QueryTimer;
use super::error_mapper::map_sqlx_error;
use crate::domain::permission::{Permission, PermissionId, PermissionRepository};

const SELECT_PERMISSION: &str =
    "SELECT id, module, action, name, description, created_at FROM permissions";

#[derive(sqlx::FromRow)]
struct PermissionRow {
    id: Uuid,
    module: String,
    action: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            id: PermissionId::from_uuid(row.id),
            module: row.module,
            action: row.action,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

pub(crate) async fn insert<'e, E: PgExecutor<'e>>(
    executor: E,
    permission: &Permission,
) -> AppResult<()> {
    let timer = QueryTimer::new("permissions", "insert");
    let result = sqlx::query(
        r#"
        INSERT INTO permissions (id, module, action, name, description, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(permission.id.0)
    .bind(&permission.module)
    .bind(&permission.action)
    .bind(&permission.name)
    .bind(&permission.description)
    .bind(permission.created_at)
    .execute(executor)
    .await;
    timer.observe(&result);

    result.map_err(map_sqlx_error)?;
    Ok(())
}

pub(crate) async fn fetch_by_id<'e, E: PgExecutor<'e>>(
    executor: E,
    id: &PermissionId,
) -> AppResult<Option<Permission>> {
    let timer = QueryTimer::new("permissions", "find_by_id");
    let result = sqlx::query_as::<_, PermissionRow>(&format!("{} WHERE id = $1", SELECT_PERMISSION))
        .bind(id.0)
        .fetch_optional(executor)
        .await;
    timer.observe(&result);

    Ok(result.map_err(map_sqlx_error)?.map(Into::into))
}

pub(crate) async fn fetch_by_name<'e, E: PgExecutor<'e>>(
    executor: E,
    name: &str,
) -> AppResult<Option<Permission>> {
    let timer = QueryTimer::new("permissions", "find_by_name");
    let result =
        sqlx::query_as::<_, PermissionRow>(&format!("{} WHERE name = $1", SELECT_PERMISSION))
            .bind(name)
            .fetch_optional(executor)
            .await;
    timer.observe(&result);

    Ok(result.map_err(map_sqlx_error)?.map(Into::into))
}

pub(crate) async fn fetch_by_ids<'e, E: PgExecutor<'e>>(
    executor: E,
    ids: &[PermissionId],
) -> AppResult<Vec<Permission>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let uuids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
    let timer = QueryTimer::new("permissions", "find_by_ids");
    let result = sqlx::query_as::<_, PermissionRow>(&format!(
        "{} WHERE id = ANY($1) ORDER BY module, action",
        SELECT_PERMISSION
    ))
    .bind(&uuids)
    .fetch_all(executor)
    .await;
    timer.observe(&result);

    Ok(result
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(Into::into)
        .collect())
}

pub(crate) async fn fetch_all<'e, E: PgExecutor<'e>>(executor: E) -> AppResult<Vec<Permission>> {
    let timer = QueryTimer::new("permissions", "list_all");
    let result = sqlx::query_as::<_, PermissionRow>(&format!(
        "{} ORDER BY module, action",
        SELECT_PERMISSION
    ))
    .fetch_all(executor)
    .await;
    timer.observe(&result);

    Ok(result
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(Into::into)
        .collect())
}

pub(crate) async fn fetch_by_module<'e, E: PgExecutor<'e>>(
    executor: E,
    module: &str,
) -> AppResult<Vec<Permission>> {
    let timer = QueryTimer::new("permissions", "list_by_module");
    let result = sqlx::query_as::<_, PermissionRow>(&format!(
        "{} WHERE module = $1 ORDER BY action",
        SELECT_PERMISSION
    ))
    .bind(module)
    .fetch_all(executor)
    .await;
    timer.observe(&result);

    Ok(result
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(Into::into)
        .collect())
}

pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn create(&self, permission: &Permission) -> AppResult<()> {
        insert(&self.pool, permission).await
    }

    async fn find_by_id(&self, id: &PermissionId) -> AppResult<Option<Permission>> {
        fetch_by_id(&self.pool, id).await
    }

    async fn find_by_name(&self, name: &str) -> AppResult<Option<Permission>> {
        fetch_by_name(&self.pool, name).await
    }

    async fn find_by_ids(&self, ids: &[PermissionId]) -> AppResult<Vec<Permission>> {
        fetch_by_ids(&self.pool, ids).await
    }

    async fn list_all(&self) -> AppResult<Vec<Permission>> {
        fetch_all(&self.pool).await
    }

    async fn list_by_module(&self, module: &str) -> AppResult<Vec<Permission>> {
        fetch_by_module(&self.pool, module).await
    }
}
