//! Kiosk access control
//!
//! Role default permissions overridden by per-user grants and revokes.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod service;

pub use error::{AccessError, AccessResult};
pub use service::{AccessService, InMemoryAccessService, PostgresAccessService};
