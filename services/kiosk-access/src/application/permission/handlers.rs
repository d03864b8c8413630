//! Permission command handler

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use kiosk_errors::AppError;
use metrics::counter;
use tracing::{error, info, warn};

use super::commands::*;
use crate::domain::permission::{
    DEFAULT_CATALOG, OverrideChange, OverrideState, PermissionId, Role, UserPermissionOverride,
    default_role_grants,
};
use crate::domain::unit_of_work::{SaveScope, UnitOfWork, UnitOfWorkFactory};
use crate::error::{AccessError, AccessResult};

/// Outcome of seeding the default catalog
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub permissions_existing: usize,
    /// Roles whose default grants were written; empty unless the catalog was new
    pub roles_seeded: Vec<Role>,
}

/// Failure inside an open unit of work
enum StepError {
    /// Request refused; nothing was written
    Rejected(AccessError),
    /// Storage failed mid-save
    Store(AppError),
}

impl From<AppError> for StepError {
    fn from(error: AppError) -> Self {
        StepError::Store(error)
    }
}

type StepResult<T> = Result<T, StepError>;

/// Permission command handler
///
/// Every save runs in one unit of work holding the scope lock, so a failure
/// at any step rolls the whole save back.
pub struct PermissionCommandHandler {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

impl PermissionCommandHandler {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow_factory }
    }

    /// Replace the role's default grants with exactly `cmd.permission_ids`
    pub async fn handle_save_role_permissions(
        &self,
        cmd: SaveRolePermissionsCommand,
    ) -> AccessResult<()> {
        let scope = SaveScope::Role(cmd.role);
        let permission_ids = cmd.permission_ids();

        let uow = self.begin(&scope).await?;
        let outcome = replace_role_permissions(uow.as_ref(), &scope, cmd.role, &permission_ids).await;
        finish(uow, &scope, outcome).await?;

        info!(
            role = %cmd.role,
            granted = permission_ids.len(),
            performed_by = ?cmd.performed_by,
            "Role permissions saved"
        );
        Ok(())
    }

    /// Replace the user's overrides; `Inherited` entries are dropped
    pub async fn handle_save_user_overrides(
        &self,
        cmd: SaveUserOverridesCommand,
    ) -> AccessResult<()> {
        let scope = SaveScope::User(cmd.user_id.clone());
        let entries = cmd.persisted_entries();

        let uow = self.begin(&scope).await?;
        let outcome = replace_user_overrides(uow.as_ref(), &scope, &cmd, &entries).await;
        finish(uow, &scope, outcome).await?;

        info!(
            user_id = %cmd.user_id,
            stored = entries.len(),
            inherited = cmd.overrides.len() - entries.len(),
            performed_by = ?cmd.performed_by,
            "User overrides saved"
        );
        Ok(())
    }

    /// Advance one override and return the new state
    ///
    /// Fails with [`AccessError::StaleOverride`] when the stored state is no
    /// longer `cmd.current`.
    pub async fn handle_cycle_user_override(
        &self,
        cmd: CycleUserOverrideCommand,
    ) -> AccessResult<OverrideState> {
        let scope = SaveScope::User(cmd.user_id.clone());

        let uow = self.begin(&scope).await?;
        let outcome = cycle_override(uow.as_ref(), &scope, &cmd).await;
        let next = finish(uow, &scope, outcome).await?;

        info!(
            user_id = %cmd.user_id,
            permission_id = %cmd.permission_id,
            from = %cmd.current,
            to = %next,
            performed_by = ?cmd.performed_by,
            "User override cycled"
        );
        Ok(next)
    }

    /// Insert missing catalog permissions
    ///
    /// Role defaults are only written when the catalog was empty, so grants
    /// edited by an administrator survive restarts.
    pub async fn handle_seed_catalog(&self) -> AccessResult<SeedReport> {
        let scope = SaveScope::Catalog;

        let uow = self.begin(&scope).await?;
        let outcome = seed_catalog(uow.as_ref(), &scope).await;
        let report = finish(uow, &scope, outcome).await?;

        info!(
            created = report.permissions_created,
            existing = report.permissions_existing,
            roles_seeded = report.roles_seeded.len(),
            "Permission catalog seeded"
        );
        Ok(report)
    }

    async fn begin(&self, scope: &SaveScope) -> AccessResult<Box<dyn UnitOfWork>> {
        self.uow_factory.begin().await.map_err(|source| {
            error!(scope = %scope, error = %source, "Failed to begin unit of work");
            record_save(scope, "failed");
            AccessError::SaveFailed {
                scope: scope.to_string(),
                rolled_back: true,
                source,
            }
        })
    }
}

async fn replace_role_permissions(
    uow: &dyn UnitOfWork,
    scope: &SaveScope,
    role: Role,
    permission_ids: &[PermissionId],
) -> StepResult<()> {
    uow.lock_scope(scope).await?;
    ensure_permissions_exist(uow, permission_ids).await?;
    uow.role_permissions()
        .replace_for_role(role, permission_ids)
        .await?;
    Ok(())
}

async fn replace_user_overrides(
    uow: &dyn UnitOfWork,
    scope: &SaveScope,
    cmd: &SaveUserOverridesCommand,
    entries: &[UserPermissionOverride],
) -> StepResult<()> {
    uow.lock_scope(scope).await?;
    let ids: Vec<PermissionId> = entries.iter().map(|e| e.permission_id).collect();
    ensure_permissions_exist(uow, &ids).await?;
    uow.user_overrides()
        .replace_for_user(&cmd.user_id, entries)
        .await?;
    Ok(())
}

async fn cycle_override(
    uow: &dyn UnitOfWork,
    scope: &SaveScope,
    cmd: &CycleUserOverrideCommand,
) -> StepResult<OverrideState> {
    uow.lock_scope(scope).await?;
    ensure_permissions_exist(uow, &[cmd.permission_id]).await?;

    let actual = uow
        .user_overrides()
        .find(&cmd.user_id, &cmd.permission_id)
        .await?
        .map(|o| o.state())
        .unwrap_or_default();

    if actual != cmd.current {
        return Err(StepError::Rejected(AccessError::StaleOverride {
            permission_id: cmd.permission_id,
            expected: cmd.current,
            actual,
        }));
    }

    let next = actual.next();
    let overrides = uow.user_overrides();
    let written = match actual.transition_to(next) {
        Some(OverrideChange::Insert { granted }) => {
            overrides
                .insert(&UserPermissionOverride::new(
                    cmd.user_id.clone(),
                    cmd.permission_id,
                    granted,
                ))
                .await?;
            true
        }
        Some(OverrideChange::Update { granted }) => {
            overrides
                .set_granted(&cmd.user_id, &cmd.permission_id, granted)
                .await?
        }
        Some(OverrideChange::Delete) => overrides.delete(&cmd.user_id, &cmd.permission_id).await?,
        None => true,
    };

    // Row vanished after the read
    if !written {
        return Err(StepError::Rejected(AccessError::StaleOverride {
            permission_id: cmd.permission_id,
            expected: cmd.current,
            actual: OverrideState::Inherited,
        }));
    }

    Ok(next)
}

async fn seed_catalog(uow: &dyn UnitOfWork, scope: &SaveScope) -> StepResult<SeedReport> {
    uow.lock_scope(scope).await?;

    let existing = uow.permissions().list_all().await?;
    let catalog_was_empty = existing.is_empty();
    let known: HashSet<&str> = existing.iter().map(|p| p.name.as_str()).collect();

    let mut report = SeedReport::default();
    for entry in DEFAULT_CATALOG {
        if known.contains(entry.name().as_str()) {
            report.permissions_existing += 1;
            continue;
        }
        uow.permissions().create(&entry.to_permission()).await?;
        report.permissions_created += 1;
    }

    if catalog_was_empty {
        let by_name: HashMap<String, PermissionId> = uow
            .permissions()
            .list_all()
            .await?
            .into_iter()
            .map(|p| (p.name, p.id))
            .collect();

        for role in Role::ALL {
            let ids: Vec<PermissionId> = default_role_grants(role)
                .iter()
                .filter_map(|name| by_name.get(name).copied())
                .collect();
            uow.role_permissions().replace_for_role(role, &ids).await?;
            report.roles_seeded.push(role);
        }
    }

    Ok(report)
}

async fn ensure_permissions_exist(
    uow: &dyn UnitOfWork,
    permission_ids: &[PermissionId],
) -> StepResult<()> {
    if permission_ids.is_empty() {
        return Ok(());
    }

    let found: HashSet<PermissionId> = uow
        .permissions()
        .find_by_ids(permission_ids)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    match permission_ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(StepError::Rejected(AccessError::PermissionNotFound(
            *missing,
        ))),
        None => Ok(()),
    }
}

/// Commit on success, otherwise roll back and report
async fn finish<T>(
    uow: Box<dyn UnitOfWork>,
    scope: &SaveScope,
    outcome: StepResult<T>,
) -> AccessResult<T> {
    let step_error = match outcome {
        Ok(value) => {
            return match uow.commit().await {
                Ok(()) => {
                    record_save(scope, "committed");
                    Ok(value)
                }
                Err(source) => {
                    error!(scope = %scope, error = %source, "Commit failed");
                    record_save(scope, "failed");
                    Err(AccessError::SaveFailed {
                        scope: scope.to_string(),
                        rolled_back: false,
                        source,
                    })
                }
            };
        }
        Err(e) => e,
    };

    let rolled_back = match uow.rollback().await {
        Ok(()) => true,
        Err(e) => {
            error!(scope = %scope, error = %e, "Rollback failed");
            false
        }
    };

    match step_error {
        StepError::Rejected(err) => {
            warn!(scope = %scope, error = %err, "Save rejected");
            record_save(scope, "rejected");
            Err(err)
        }
        StepError::Store(source) => {
            error!(scope = %scope, error = %source, rolled_back, "Save failed");
            record_save(scope, "failed");
            Err(AccessError::SaveFailed {
                scope: scope.to_string(),
                rolled_back,
                source,
            })
        }
    }
}

fn record_save(scope: &SaveScope, outcome: &'static str) {
    counter!("permission_saves_total", "scope" => scope.kind(), "outcome" => outcome)
        .increment(1);
}
