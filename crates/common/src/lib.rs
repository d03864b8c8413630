//! kiosk-common - shared identifier types

pub mod types;

pub use types::*;
