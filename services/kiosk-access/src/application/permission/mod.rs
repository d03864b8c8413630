pub mod commands;
pub mod handlers;
pub mod queries;
pub mod query_handlers;

pub use commands::*;
pub use handlers::{PermissionCommandHandler, SeedReport};
pub use queries::*;
pub use query_handlers::{PermissionEntry, PermissionQueryHandler};
