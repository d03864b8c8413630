pub mod permission;
pub mod unit_of_work;

pub use unit_of_work::{SaveScope, UnitOfWork, UnitOfWorkFactory};
