//! PostgreSQL schema migrations
//!
//! Each migration runs in its own transaction together with its bookkeeping
//! row, so a failed script leaves neither schema changes nor a record.

use std::collections::HashMap;

use kiosk_errors::{AppError, AppResult};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, warn};

/// Applied migration record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub checksum: String,
}

/// Migration definition
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    /// May contain several statements
    pub up_sql: String,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = Self::calculate_checksum(&up_sql);
        Self {
            version,
            name: name.into(),
            up_sql,
            checksum,
        }
    }

    /// SHA-256 of the up script, stable across toolchains
    fn calculate_checksum(sql: &str) -> String {
        hex::encode(Sha256::digest(sql.as_bytes()))
    }
}

/// Migration runner
pub struct MigrationManager {
    pool: PgPool,
    table_name: String,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: "_migrations".to_string(),
        }
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    /// Create the bookkeeping table
    pub async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                checksum VARCHAR(64) NOT NULL
            )
            "#,
            self.table_name
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;

        Ok(())
    }

    pub async fn get_applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at, checksum FROM {} ORDER BY version ASC",
            self.table_name
        );

        sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))
    }

    /// Apply a single migration
    pub async fn apply(&self, migration: &Migration) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::raw_sql(&migration.up_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to apply migration {}: {}",
                    migration.version, e
                ))
            })?;

        let insert_sql = format!(
            "INSERT INTO {} (version, name, checksum) VALUES ($1, $2, $3)",
            self.table_name
        );
        sqlx::query(&insert_sql)
            .bind(migration.version)
            .bind(&migration.name)
            .bind(&migration.checksum)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

        info!(
            version = migration.version,
            name = %migration.name,
            "Migration applied"
        );

        Ok(())
    }

    /// Apply every pending migration in version order
    ///
    /// Stops at the first failure. A checksum mismatch on an applied
    /// migration is a failure too: nothing after it is applied.
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationResult> {
        self.init().await?;

        let applied: HashMap<i64, MigrationRecord> = self
            .get_applied_migrations()
            .await?
            .into_iter()
            .map(|r| (r.version, r))
            .collect();

        let mut result = MigrationResult::default();
        for migration in plan(&applied, migrations, &mut result) {
            match self.apply(migration).await {
                Ok(()) => result.applied.push(migration.version),
                Err(e) => {
                    result.errors.push(MigrationError {
                        version: migration.version,
                        name: migration.name.clone(),
                        error: e.to_string(),
                    });
                    break;
                }
            }
        }

        Ok(result)
    }
}

/// Pending migrations in version order
///
/// Already applied versions go to `result.skipped`. The first modified one is
/// recorded in `result.errors` and ends the plan.
fn plan<'a>(
    applied: &HashMap<i64, MigrationRecord>,
    migrations: &'a [Migration],
    result: &mut MigrationResult,
) -> Vec<&'a Migration> {
    let mut sorted: Vec<&Migration> = migrations.iter().collect();
    sorted.sort_by_key(|m| m.version);

    let mut pending = Vec::new();
    for migration in sorted {
        match applied.get(&migration.version) {
            Some(record) if record.checksum != migration.checksum => {
                warn!(version = migration.version, "Applied migration was modified");
                result.errors.push(MigrationError {
                    version: migration.version,
                    name: migration.name.clone(),
                    error: "Checksum mismatch - migration has been modified".to_string(),
                });
                break;
            }
            Some(_) => result.skipped.push(migration.version),
            None => pending.push(migration),
        }
    }
    pending
}

/// Outcome of [`MigrationManager::migrate`]
#[derive(Debug, Clone, Default)]
pub struct MigrationResult {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
    pub errors: Vec<MigrationError>,
}

impl MigrationResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationError {
    pub version: i64,
    pub name: String,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(migration: &Migration, checksum: &str) -> (i64, MigrationRecord) {
        (
            migration.version,
            MigrationRecord {
                version: migration.version,
                name: migration.name.clone(),
                applied_at: chrono::Utc::now(),
                checksum: checksum.to_string(),
            },
        )
    }

    #[test]
    fn test_migration_creation() {
        let migration = Migration::new(1, "create_permissions", "CREATE TABLE permissions (id UUID)");

        assert_eq!(migration.version, 1);
        assert_eq!(migration.name, "create_permissions");
        assert_eq!(migration.checksum.len(), 64);
    }

    #[test]
    fn test_plan_skips_applied_and_sorts_pending() {
        let m1 = Migration::new(1, "one", "SELECT 1");
        let m2 = Migration::new(2, "two", "SELECT 2");
        let m3 = Migration::new(3, "three", "SELECT 3");
        let applied = HashMap::from([record(&m1, &m1.checksum)]);
        let migrations = vec![m3.clone(), m1.clone(), m2.clone()];

        let mut result = MigrationResult::default();
        let pending: Vec<i64> = plan(&applied, &migrations, &mut result)
            .iter()
            .map(|m| m.version)
            .collect();

        assert_eq!(pending, vec![2, 3]);
        assert_eq!(result.skipped, vec![1]);
        assert!(result.is_success());
    }

    #[test]
    fn test_plan_stops_at_modified_migration() {
        let m1 = Migration::new(1, "one", "SELECT 1");
        let m2 = Migration::new(2, "two", "SELECT 2");
        let m3 = Migration::new(3, "three", "SELECT 3");
        let applied = HashMap::from([record(&m1, &m1.checksum), record(&m2, "edited")]);
        let migrations = vec![m1, m2, m3];

        let mut result = MigrationResult::default();
        let pending = plan(&applied, &migrations, &mut result);

        assert!(pending.is_empty());
        assert_eq!(result.skipped, vec![1]);
        assert!(!result.is_success());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].version, 2);
    }

    #[test]
    fn test_checksum_consistency() {
        let sql = "CREATE TABLE test (id INT)";
        let m1 = Migration::new(1, "test", sql);
        let m2 = Migration::new(1, "test", sql);

        assert_eq!(m1.checksum, m2.checksum);
    }

    #[test]
    fn test_checksum_difference() {
        let m1 = Migration::new(1, "test", "CREATE TABLE test1 (id INT)");
        let m2 = Migration::new(1, "test", "CREATE TABLE test2 (id INT)");

        assert_ne!(m1.checksum, m2.checksum);
    }

    #[test]
    fn test_migration_result() {
        let result = MigrationResult {
            applied: vec![1, 2, 3],
            ..Default::default()
        };

        assert!(result.is_success());
        assert_eq!(result.applied_count(), 3);
    }
}
