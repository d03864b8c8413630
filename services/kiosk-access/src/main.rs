//! Kiosk access service bootstrap
//!
//! Loads configuration, applies the schema and seeds the permission catalog.

use std::time::Duration;

use anyhow::{Context, bail};
use kiosk_access::PostgresAccessService;
use kiosk_access::infrastructure::persistence::{DbMetrics, migrations};
use kiosk_adapter_postgres::{MigrationManager, PostgresConfig, check_connection, create_pool};
use kiosk_config::AppConfig;
use secrecy::ExposeSecret;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config_dir = std::env::args().nth(1).unwrap_or_else(|| "config".to_string());
    let config = AppConfig::load(&config_dir).context("failed to load configuration")?;

    kiosk_telemetry::init(
        &config.telemetry.log_level,
        config.telemetry.json || config.is_production(),
    )?;
    let metrics = kiosk_telemetry::init_metrics()?;

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Starting kiosk access service"
    );

    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections)
        .with_connect_timeout(Duration::from_secs(config.database.connect_timeout_secs));
    let pool = create_pool(&pg_config).await?;
    check_connection(&pool).await?;
    DbMetrics::record_pool_state(&pool, "primary");

    let result = MigrationManager::new(pool.clone())
        .migrate(&migrations())
        .await?;
    if !result.is_success() {
        for e in &result.errors {
            error!(version = e.version, name = %e.name, error = %e.error, "Migration failed");
        }
        bail!("schema migration failed");
    }
    info!(applied = result.applied_count(), "Schema up to date");

    let service = PostgresAccessService::postgres(pool.clone(), &config.access);

    if config.access.seed_catalog {
        service.commands.handle_seed_catalog().await?;
    }

    for (module, permissions) in service.queries.list_permissions_by_module().await? {
        info!(module = %module, permissions = permissions.len(), "Permission module loaded");
    }

    DbMetrics::record_pool_state(&pool, "primary");
    for sample in kiosk_telemetry::metric_samples(&metrics) {
        info!(sample = %sample, "Metric");
    }

    pool.close().await;
    Ok(())
}
