//! PostgreSQL persistence

pub mod access_unit_of_work;
pub mod db_metrics;
pub mod error_mapper;
pub mod permission_repository;
pub mod role_permission_repository;
pub mod schema;
pub mod tx_repositories;
pub mod user_override_repository;

pub use access_unit_of_work::{PostgresUnitOfWork, PostgresUnitOfWorkFactory};
pub use db_metrics::{DbMetrics, QueryTimer};
pub use permission_repository::PostgresPermissionRepository;
pub use role_permission_repository::PostgresRolePermissionRepository;
pub use schema::migrations;
pub use user_override_repository::PostgresUserOverrideRepository;
