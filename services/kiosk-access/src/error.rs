use kiosk_errors::AppError;
use thiserror::Error;

use crate::domain::permission::{OverrideState, PermissionId, UnknownRole};

pub type AccessResult<T> = Result<T, AccessError>;

#[derive(Debug, Error)]
pub enum AccessError {
    /// Storage could not be read; distinct from an empty result
    #[error("Could not load {what}: {source}")]
    LoadFailed {
        what: &'static str,
        #[source]
        source: AppError,
    },
    /// The save did not commit. `rolled_back` is true when storage is known
    /// to be unchanged.
    #[error("Could not save {scope} (rolled back: {rolled_back}): {source}")]
    SaveFailed {
        scope: String,
        rolled_back: bool,
        #[source]
        source: AppError,
    },
    #[error("Override for permission {permission_id} is {actual}, expected {expected}")]
    StaleOverride {
        permission_id: PermissionId,
        expected: OverrideState,
        actual: OverrideState,
    },
    #[error("Permission not found: {0}")]
    PermissionNotFound(PermissionId),
    #[error("Permission not found: {0}")]
    PermissionNameNotFound(String),
    #[error(transparent)]
    UnknownRole(#[from] UnknownRole),
}

impl AccessError {
    /// Wrap a store error as a failed read of `what`
    pub fn load_failed(what: &'static str) -> impl FnOnce(AppError) -> AccessError {
        move |source| AccessError::LoadFailed { what, source }
    }
}

impl From<AccessError> for AppError {
    fn from(error: AccessError) -> Self {
        match error {
            AccessError::LoadFailed { .. } => AppError::Unavailable(error.to_string()),
            AccessError::SaveFailed { .. } => AppError::Database(error.to_string()),
            AccessError::StaleOverride { .. } => AppError::Conflict(error.to_string()),
            AccessError::PermissionNotFound(_) | AccessError::PermissionNameNotFound(_) => {
                AppError::NotFound(error.to_string())
            }
            AccessError::UnknownRole(e) => AppError::Validation(e.to_string()),
        }
    }
}
