//! kiosk-adapter-postgres - PostgreSQL adapter

mod connection;
mod migration;
mod transaction;

pub use connection::*;
pub use migration::*;
pub use transaction::*;
