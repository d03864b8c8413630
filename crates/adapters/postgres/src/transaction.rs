//! PostgreSQL transaction management

use kiosk_errors::{AppError, AppResult};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

/// Transaction isolation level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    /// PostgreSQL default
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// Options applied with `SET TRANSACTION` right after `BEGIN`
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    pub isolation_level: IsolationLevel,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn serializable(self) -> Self {
        self.with_isolation_level(IsolationLevel::Serializable)
    }

    /// Build the `SET TRANSACTION` statement
    pub fn to_sql(&self) -> String {
        format!(
            "SET TRANSACTION ISOLATION LEVEL {}",
            self.isolation_level.as_sql()
        )
    }

    /// Default options need no extra round-trip
    pub fn is_default(&self) -> bool {
        self.isolation_level == IsolationLevel::default()
    }
}

/// Transaction manager
#[derive(Clone)]
pub struct TransactionManager {
    pool: PgPool,
}

impl TransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))
    }

    pub async fn begin_with_options(
        &self,
        options: &TransactionOptions,
    ) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.begin().await?;

        if !options.is_default() {
            sqlx::query(&options.to_sql())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::database(format!("Failed to set transaction options: {}", e))
                })?;
        }

        Ok(tx)
    }

    pub async fn commit(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))
    }

    pub async fn rollback(tx: Transaction<'static, Postgres>) -> AppResult<()> {
        tx.rollback()
            .await
            .map_err(|e| AppError::database(format!("Failed to rollback transaction: {}", e)))
    }
}

/// Take a transaction-scoped advisory lock on `key`
///
/// Released automatically on commit or rollback. Concurrent holders of the
/// same key block until the first transaction ends.
pub async fn advisory_xact_lock(conn: &mut PgConnection, key: &str) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("Failed to acquire advisory lock: {}", e)))?;

    debug!(key = %key, "Advisory lock acquired");
    Ok(())
}
