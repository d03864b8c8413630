//! Permission resolution domain

pub mod catalog;
pub mod draft;
pub mod override_state;
pub mod permission;
pub mod repository;
pub mod resolver;
pub mod role;

pub use catalog::{CatalogEntry, DEFAULT_CATALOG, default_role_grants};
pub use draft::{RolePermissionDraft, UserOverrideDraft};
pub use override_state::{OverrideChange, OverrideState, UserPermissionOverride};
pub use permission::{Permission, PermissionId, group_by_module};
pub use repository::{PermissionRepository, RolePermissionRepository, UserOverrideRepository};
pub use resolver::{Decision, DecisionSource, EffectivePermissions, resolve};
pub use role::{Role, UnknownRole};
