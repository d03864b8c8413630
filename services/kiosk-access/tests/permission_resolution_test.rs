use std::collections::BTreeSet;

use kiosk_access::InMemoryAccessService;
use kiosk_access::application::{
    CycleUserOverrideCommand, EffectivePermissionQuery, SaveRolePermissionsCommand,
    SaveUserOverridesCommand, UserPermissionMatrixQuery,
};
use kiosk_access::domain::permission::{
    DecisionSource, OverrideState, Permission, PermissionId, PermissionRepository, Role,
    RolePermissionDraft, UserOverrideDraft,
};
use kiosk_access::infrastructure::memory::InMemoryAccessStore;
use kiosk_common::UserId;

async fn service_with(names: &[(&str, &str)]) -> (InMemoryAccessService, Vec<PermissionId>) {
    let store = InMemoryAccessStore::new();
    let mut ids = Vec::new();
    for (module, action) in names {
        let permission = Permission::new(module, action, "");
        store.create(&permission).await.expect("create permission");
        ids.push(permission.id);
    }
    (InMemoryAccessService::in_memory(store), ids)
}

async fn effective(
    service: &InMemoryAccessService,
    user_id: &UserId,
    role: Role,
    permission_id: PermissionId,
) -> bool {
    service
        .queries
        .effective_permission(EffectivePermissionQuery {
            user_id: user_id.clone(),
            role,
            permission_id,
        })
        .await
        .expect("effective permission")
}

async fn set_override(
    service: &InMemoryAccessService,
    user_id: &UserId,
    permission_id: PermissionId,
    state: OverrideState,
) {
    service
        .commands
        .handle_save_user_overrides(SaveUserOverridesCommand::new(
            user_id.clone(),
            [(permission_id, state)],
        ))
        .await
        .expect("save overrides");
}

#[tokio::test]
async fn test_without_override_effective_equals_role_default() {
    let (service, ids) = service_with(&[("sales", "create"), ("sales", "delete")]).await;
    service
        .commands
        .handle_save_role_permissions(SaveRolePermissionsCommand::new(Role::UnitManager, [ids[0]]))
        .await
        .unwrap();

    let user_id = UserId::new();
    for role in Role::ALL {
        for id in &ids {
            let role_default = service.queries.role_has_permission(role, id).await.unwrap();
            assert_eq!(effective(&service, &user_id, role, *id).await, role_default);
        }
    }
}

#[tokio::test]
async fn test_explicit_grant_wins_over_role() {
    let (service, ids) = service_with(&[("billing", "export")]).await;
    let user_id = UserId::new();
    set_override(&service, &user_id, ids[0], OverrideState::Granted).await;

    for role in Role::ALL {
        assert!(effective(&service, &user_id, role, ids[0]).await);
    }
}

#[tokio::test]
async fn test_explicit_revoke_wins_over_role() {
    let (service, ids) = service_with(&[("reports", "view")]).await;
    for role in Role::ALL {
        service
            .commands
            .handle_save_role_permissions(SaveRolePermissionsCommand::new(role, [ids[0]]))
            .await
            .unwrap();
    }

    let user_id = UserId::new();
    set_override(&service, &user_id, ids[0], OverrideState::Revoked).await;

    for role in Role::ALL {
        assert!(!effective(&service, &user_id, role, ids[0]).await);
    }
}

#[tokio::test]
async fn test_cycle_visits_every_state_and_returns() {
    let (service, ids) = service_with(&[("lunch", "order")]).await;
    let user_id = UserId::new();

    let mut state = service
        .queries
        .user_override_state(&user_id, &ids[0])
        .await
        .unwrap();
    assert_eq!(state, OverrideState::Inherited);

    let mut seen = Vec::new();
    for _ in 0..3 {
        state = service
            .commands
            .handle_cycle_user_override(CycleUserOverrideCommand::new(
                user_id.clone(),
                ids[0],
                state,
            ))
            .await
            .unwrap();
        assert_eq!(
            service
                .queries
                .user_override_state(&user_id, &ids[0])
                .await
                .unwrap(),
            state
        );
        seen.push(state);
    }

    assert_eq!(
        seen,
        vec![
            OverrideState::Granted,
            OverrideState::Revoked,
            OverrideState::Inherited
        ]
    );
}

#[tokio::test]
async fn test_three_cycles_leave_no_rows() {
    let (service, ids) = service_with(&[("students", "manage")]).await;
    let user_id = UserId::new();

    let mut state = OverrideState::Inherited;
    for _ in 0..3 {
        state = service
            .commands
            .handle_cycle_user_override(CycleUserOverrideCommand::new(
                user_id.clone(),
                ids[0],
                state,
            ))
            .await
            .unwrap();
    }

    assert_eq!(state, OverrideState::Inherited);
    assert!(
        service
            .queries
            .list_user_overrides(&user_id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_saved_role_set_is_listed_back() {
    let (service, ids) = service_with(&[
        ("cash_register", "open"),
        ("cash_register", "close"),
        ("logistics", "view_stock"),
    ])
    .await;

    let granted: BTreeSet<PermissionId> = [ids[0], ids[2]].into_iter().collect();
    service
        .commands
        .handle_save_role_permissions(SaveRolePermissionsCommand::new(
            Role::UnitManager,
            granted.clone(),
        ))
        .await
        .unwrap();

    let listed: BTreeSet<PermissionId> = service
        .queries
        .list_role_permissions(Role::UnitManager)
        .await
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(listed, granted);
}

#[tokio::test]
async fn test_saving_empty_set_clears_kitchen() {
    let (service, ids) = service_with(&[("lunch", "view"), ("lunch", "manage_menu")]).await;
    service
        .commands
        .handle_save_role_permissions(SaveRolePermissionsCommand::new(Role::Kitchen, ids.clone()))
        .await
        .unwrap();

    service
        .commands
        .handle_save_role_permissions(SaveRolePermissionsCommand::new(
            Role::Kitchen,
            Vec::<PermissionId>::new(),
        ))
        .await
        .unwrap();

    assert!(
        service
            .queries
            .list_role_permissions(Role::Kitchen)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_inherited_entries_are_not_stored() {
    let (service, ids) = service_with(&[("sales", "view"), ("sales", "refund")]).await;
    let user_id = UserId::new();

    service
        .commands
        .handle_save_user_overrides(SaveUserOverridesCommand::new(
            user_id.clone(),
            [
                (ids[0], OverrideState::Inherited),
                (ids[1], OverrideState::Revoked),
            ],
        ))
        .await
        .unwrap();

    let rows = service.queries.list_user_overrides(&user_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].permission_id, ids[1]);
    assert!(!rows[0].granted);
}

#[tokio::test]
async fn test_user_save_replaces_previous_overrides() {
    let (service, ids) = service_with(&[("billing", "view"), ("billing", "charge")]).await;
    let user_id = UserId::new();
    set_override(&service, &user_id, ids[0], OverrideState::Granted).await;
    set_override(&service, &user_id, ids[1], OverrideState::Granted).await;

    let rows = service.queries.list_user_overrides(&user_id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].permission_id, ids[1]);
}

#[tokio::test]
async fn test_cashier_with_revoked_view() {
    let (service, ids) = service_with(&[("sales", "create"), ("sales", "view")]).await;
    let (create, view) = (ids[0], ids[1]);

    service
        .commands
        .handle_save_role_permissions(SaveRolePermissionsCommand::new(
            Role::Cashier,
            [create, view],
        ))
        .await
        .unwrap();

    let u1 = UserId::new();
    set_override(&service, &u1, view, OverrideState::Revoked).await;

    assert!(effective(&service, &u1, Role::Cashier, create).await);
    assert!(!effective(&service, &u1, Role::Cashier, view).await);

    let snapshot = service
        .queries
        .effective_permissions(&u1, Role::Cashier)
        .await
        .unwrap();
    assert_eq!(snapshot.decide(&create).source, DecisionSource::Role);
    assert_eq!(snapshot.decide(&view).source, DecisionSource::UserRevoke);
    assert_eq!(snapshot.granted(), BTreeSet::from([create]));
}

#[tokio::test]
async fn test_matrix_rows_follow_catalog_order() {
    let (service, ids) = service_with(&[("sales", "view"), ("billing", "view")]).await;
    let user_id = UserId::new();
    service
        .commands
        .handle_save_role_permissions(SaveRolePermissionsCommand::new(Role::Parent, [ids[1]]))
        .await
        .unwrap();
    set_override(&service, &user_id, ids[0], OverrideState::Granted).await;

    let rows = service
        .queries
        .user_permission_matrix(UserPermissionMatrixQuery {
            user_id,
            role: Role::Parent,
        })
        .await
        .unwrap();

    let names: Vec<&str> = rows.iter().map(|r| r.permission.name.as_str()).collect();
    assert_eq!(names, vec!["billing.view", "sales.view"]);
    assert!(rows[0].role_default && rows[0].effective);
    assert_eq!(rows[0].override_state, OverrideState::Inherited);
    assert!(!rows[1].role_default && rows[1].effective);
    assert_eq!(rows[1].source, DecisionSource::UserGrant);
}

#[tokio::test]
async fn test_editor_drafts_round_trip_through_saves() {
    let (service, ids) = service_with(&[("admin", "manage_users"), ("reports", "export")]).await;
    let user_id = UserId::new();

    let current = service
        .queries
        .list_role_permissions(Role::NetworkSupervisor)
        .await
        .unwrap();
    let mut role_draft = RolePermissionDraft::new(Role::NetworkSupervisor, current);
    role_draft.toggle(ids[1]);
    service
        .commands
        .handle_save_role_permissions(SaveRolePermissionsCommand::from_draft(role_draft, None))
        .await
        .unwrap();

    let overrides = service.queries.list_user_overrides(&user_id).await.unwrap();
    let mut user_draft = UserOverrideDraft::new(user_id.clone(), overrides);
    user_draft.cycle(ids[0]);
    user_draft.cycle(ids[1]);
    user_draft.cycle(ids[1]);
    service
        .commands
        .handle_save_user_overrides(SaveUserOverridesCommand::from_draft(user_draft, None))
        .await
        .unwrap();

    assert!(effective(&service, &user_id, Role::NetworkSupervisor, ids[0]).await);
    assert!(!effective(&service, &user_id, Role::NetworkSupervisor, ids[1]).await);
    assert!(
        service
            .queries
            .role_has_permission(Role::NetworkSupervisor, &ids[1])
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_seeded_catalog_is_grouped_by_module() {
    let service = InMemoryAccessService::in_memory(InMemoryAccessStore::new());
    service.commands.handle_seed_catalog().await.unwrap();

    let modules = service.queries.list_permissions_by_module().await.unwrap();
    let names: Vec<&str> = modules.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "admin",
            "billing",
            "cash_register",
            "logistics",
            "lunch",
            "reports",
            "sales",
            "students"
        ]
    );

    let user_id = UserId::new();
    let query = |role: &str, permission: &str| kiosk_access::application::CheckPermissionQuery {
        user_id: user_id.clone(),
        role: role.to_string(),
        permission: permission.to_string(),
    };
    assert!(
        service
            .queries
            .check_permission(query("cashier", "sales.create"))
            .await
            .unwrap()
    );
    assert!(
        !service
            .queries
            .check_permission(query("parent", "sales.delete"))
            .await
            .unwrap()
    );
}
