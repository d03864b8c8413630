//! Application layer

pub mod permission;

pub use permission::{
    CheckPermissionQuery, CycleUserOverrideCommand, EffectivePermissionQuery,
    PermissionCommandHandler, PermissionEntry, PermissionQueryHandler, SaveRolePermissionsCommand,
    SaveUserOverridesCommand, SeedReport, UserPermissionMatrixQuery,
};
