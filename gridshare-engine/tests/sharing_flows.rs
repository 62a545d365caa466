//! End-to-end sharing flows over the in-memory stores

mod common;

use std::sync::Arc;

use common::Env;
use gridshare_core::error::{EngineError, GENERIC_NOT_FOUND};
use gridshare_core::store::DashboardStore;
use gridshare_core::types::{
    AccessLevel, AuditAction, DashboardId, DashboardPatch, DashboardSettings, PolicyDefaults,
    Role, UserId, Visibility,
};
use gridshare_engine::dashboards::DashboardService;
use gridshare_engine::policy::PolicyService;
use gridshare_engine::store::{
    FailingAuditSink, MemoryDashboardStore, MemoryPolicyOverrides, MemoryUserStore,
    RecordingPublisher,
};

fn titled(title: &str) -> DashboardPatch {
    DashboardPatch {
        title: Some(title.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn upsert_access_twice_keeps_one_row_with_latest_level() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    env.seed_user("collab", Role::Viewer).await;

    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();

    let acl = env
        .dashboards
        .upsert_access(&view.id, "collab@example.com", AccessLevel::Viewer, &owner)
        .await
        .unwrap();
    assert_eq!(acl.len(), 1);
    assert_eq!(acl[0].access_level, AccessLevel::Viewer);

    let acl = env
        .dashboards
        .upsert_access(&view.id, "collab@example.com", AccessLevel::Editor, &owner)
        .await
        .unwrap();
    assert_eq!(acl.len(), 1);
    assert_eq!(acl[0].user_id, UserId::from("collab"));
    assert_eq!(acl[0].access_level, AccessLevel::Editor);
}

#[tokio::test]
async fn owner_never_appears_in_own_acl() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    env.seed_user("next", Role::Editor).await;
    env.seed_user("collab", Role::Viewer).await;

    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();

    // Granting the owner a row is refused outright.
    let err = env
        .dashboards
        .upsert_access(&view.id, "owner@example.com", AccessLevel::Editor, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    env.dashboards
        .upsert_access(&view.id, "collab@example.com", AccessLevel::Viewer, &owner)
        .await
        .unwrap();
    env.dashboards
        .upsert_access(&view.id, "next@example.com", AccessLevel::Editor, &owner)
        .await
        .unwrap();

    // After transfer the new owner's row is gone and the old owner is
    // an editor collaborator.
    env.dashboards
        .transfer_ownership(&view.id, &UserId::from("next"), &owner)
        .await
        .unwrap();

    let stored = env.store.find(&view.id).await.unwrap().unwrap();
    assert_eq!(stored.owner, UserId::from("next"));
    assert!(stored.acl_entry(&stored.owner).is_none());
    let old_owner_row = stored.acl_entry(&UserId::from("owner")).unwrap();
    assert_eq!(old_owner_row.access_level, AccessLevel::Editor);
    assert!(stored.acl_entry(&UserId::from("collab")).is_some());
}

#[tokio::test]
async fn transfer_to_current_owner_is_idempotent() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    env.seed_user("collab", Role::Viewer).await;

    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();
    env.dashboards
        .upsert_access(&view.id, "collab@example.com", AccessLevel::Viewer, &owner)
        .await
        .unwrap();

    let before = env.store.find(&view.id).await.unwrap().unwrap();
    env.dashboards
        .transfer_ownership(&view.id, &owner.user_id, &owner)
        .await
        .unwrap();
    let after = env.store.find(&view.id).await.unwrap().unwrap();

    assert_eq!(after.owner, before.owner);
    assert_eq!(after.acl, before.acl);
    assert_eq!(after.updated_at, before.updated_at);
}

#[tokio::test]
async fn private_to_public_mints_token_and_public_to_link_keeps_it() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();
    assert_eq!(view.visibility, Visibility::Private);
    assert!(view.share_token.is_none());

    let view = env
        .dashboards
        .set_visibility(&view.id, Visibility::Public, &owner)
        .await
        .unwrap();
    let minted = view.share_token.clone().unwrap();

    let view = env
        .dashboards
        .set_visibility(&view.id, Visibility::Link, &owner)
        .await
        .unwrap();
    assert_eq!(view.share_token.as_deref(), Some(minted.as_str()));

    // Back to private clears the token; re-publishing mints a new one.
    let view = env
        .dashboards
        .set_visibility(&view.id, Visibility::Private, &owner)
        .await
        .unwrap();
    assert!(view.share_token.is_none());

    let view = env
        .dashboards
        .set_visibility(&view.id, Visibility::Public, &owner)
        .await
        .unwrap();
    assert_ne!(view.share_token.as_deref(), Some(minted.as_str()));
}

#[tokio::test]
async fn share_token_reads_and_rotation() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();

    // Private dashboards have nothing to rotate.
    let err = env
        .dashboards
        .rotate_share_token(&view.id, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PreconditionFailed(_)));

    let view = env
        .dashboards
        .set_visibility(&view.id, Visibility::Link, &owner)
        .await
        .unwrap();
    let token = view.share_token.clone().unwrap();

    let by_token = env.dashboards.read_by_token(&token).await.unwrap();
    assert_eq!(by_token.id, view.id);
    assert!(by_token.permissions.can_read && !by_token.permissions.can_edit);

    let rotated = env
        .dashboards
        .rotate_share_token(&view.id, &owner)
        .await
        .unwrap();
    let new_token = rotated.share_token.unwrap();
    assert_ne!(new_token, token);

    // The old bearer credential is dead.
    let err = env.dashboards.read_by_token(&token).await.unwrap_err();
    assert_eq!(err.to_string(), GENERIC_NOT_FOUND);
    env.dashboards.read_by_token(&new_token).await.unwrap();
}

#[tokio::test]
async fn read_denial_is_indistinguishable_from_absence() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    let stranger = env.seed_user("stranger", Role::Editor).await;
    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();

    let denied = env
        .dashboards
        .read(&view.id, Some(&stranger), None)
        .await
        .unwrap_err();
    let absent = env
        .dashboards
        .read(&DashboardId::from("no-such-id"), Some(&stranger), None)
        .await
        .unwrap_err();

    assert_eq!(denied.to_string(), absent.to_string());
    assert_eq!(denied.to_string(), GENERIC_NOT_FOUND);
}

#[tokio::test]
async fn viewer_grant_reads_but_cannot_edit_or_share() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    let collab = env.seed_user("collab", Role::Viewer).await;

    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();
    env.dashboards
        .upsert_access(&view.id, "collab@example.com", AccessLevel::Viewer, &owner)
        .await
        .unwrap();

    let seen = env
        .dashboards
        .read(&view.id, Some(&collab), None)
        .await
        .unwrap();
    // Plain readers never see the bearer token or the ACL.
    assert!(seen.share_token.is_none());
    assert!(seen.acl.is_none());

    let err = env
        .dashboards
        .update(&view.id, titled("renamed"), &collab)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = env
        .dashboards
        .list_collaborators(&view.id, &collab)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn editor_collaborator_cannot_delete_but_owner_can() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    let collab = env.seed_user("collab", Role::Editor).await;

    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();
    env.dashboards
        .upsert_access(&view.id, "collab@example.com", AccessLevel::Editor, &owner)
        .await
        .unwrap();

    let err = env.dashboards.delete(&view.id, &collab).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    env.dashboards.delete(&view.id, &owner).await.unwrap();
    assert!(env.store.find(&view.id).await.unwrap().is_none());
}

#[tokio::test]
async fn safe_mode_blocks_script_changes_but_not_identical_writes() {
    let env = Env::new();
    let admin = env.seed_user("root", Role::Admin).await;
    let owner = env.seed_user("owner", Role::Editor).await;

    // Admin seeds a dashboard with a script while execution is trusted.
    env.policy
        .set(
            gridshare_core::types::PolicyUpdate {
                execution_mode: Some("trusted".to_string()),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap();

    let with_script = |script: &str| DashboardPatch {
        settings: Some(DashboardSettings {
            script: Some(script.to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };

    let view = env
        .dashboards
        .create(with_script("render()"), &owner)
        .await
        .unwrap();

    env.policy
        .set(
            gridshare_core::types::PolicyUpdate {
                execution_mode: Some("safe".to_string()),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap();

    // Byte-identical script is an unrelated edit and passes.
    env.dashboards
        .update(&view.id, with_script("render()"), &owner)
        .await
        .unwrap();

    // A single-character divergence is an introduction and fails.
    let err = env
        .dashboards
        .update(&view.id, with_script("render();"), &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    // Edits that never touch settings still work.
    env.dashboards
        .update(&view.id, titled("renamed"), &owner)
        .await
        .unwrap();
}

#[tokio::test]
async fn grant_probe_by_a_stranger_reads_as_absence() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    let stranger = env.seed_user("stranger", Role::Editor).await;

    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();

    // Probing an existing private dashboard with an unknown email must
    // answer exactly like probing an id that does not exist.
    let denied = env
        .dashboards
        .upsert_access(&view.id, "ghost@example.com", AccessLevel::Viewer, &stranger)
        .await
        .unwrap_err();
    let absent = env
        .dashboards
        .upsert_access(
            &DashboardId::from("no-such-id"),
            "ghost@example.com",
            AccessLevel::Viewer,
            &stranger,
        )
        .await
        .unwrap_err();

    assert_eq!(denied.to_string(), absent.to_string());
    assert_eq!(denied.to_string(), GENERIC_NOT_FOUND);

    // Holders of manage rights still get the informative error.
    let err = env
        .dashboards
        .upsert_access(&view.id, "ghost@example.com", AccessLevel::Viewer, &owner)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn no_op_update_skips_write_audit_and_publish() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;
    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();

    let before = env.store.find(&view.id).await.unwrap().unwrap();
    let published_before = env.publisher.views().len();

    env.dashboards
        .update(&view.id, titled("ops"), &owner)
        .await
        .unwrap();

    let after = env.store.find(&view.id).await.unwrap().unwrap();
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(env.publisher.views().len(), published_before);
    let actions: Vec<AuditAction> = env.audit.events().iter().map(|e| e.action).collect();
    assert!(!actions.contains(&AuditAction::DashboardUpdated));

    // A real change still writes, audits and publishes.
    env.dashboards
        .update(&view.id, titled("ops v2"), &owner)
        .await
        .unwrap();
    let actions: Vec<AuditAction> = env.audit.events().iter().map(|e| e.action).collect();
    assert!(actions.contains(&AuditAction::DashboardUpdated));
    assert_eq!(env.publisher.views().len(), published_before + 1);
}

#[tokio::test]
async fn audit_failures_never_surface_to_the_caller() {
    let store = Arc::new(MemoryDashboardStore::new());
    let accounts = Arc::new(MemoryUserStore::new());
    let audit = Arc::new(FailingAuditSink);
    let publisher = Arc::new(RecordingPublisher::new());
    let policy = Arc::new(PolicyService::new(
        Arc::new(MemoryPolicyOverrides::new()),
        PolicyDefaults::default(),
        audit.clone(),
    ));
    let dashboards = DashboardService::new(
        store.clone(),
        accounts.clone(),
        policy,
        audit,
        publisher,
    );

    let user = gridshare_core::types::User {
        id: UserId::from("owner"),
        email: "owner@example.com".to_string(),
        role: Role::Editor,
        active: true,
        session_version: 0,
        registered_at: chrono::Utc::now(),
        last_login: None,
    };
    let owner = gridshare_core::types::Actor::from(&user);
    accounts.seed(user).await;

    let view = dashboards.create(titled("ops"), &owner).await.unwrap();
    dashboards
        .set_visibility(&view.id, Visibility::Public, &owner)
        .await
        .unwrap();
}

#[tokio::test]
async fn views_publish_in_commit_order() {
    let env = Env::new();
    let owner = env.seed_user("owner", Role::Editor).await;

    let view = env.dashboards.create(titled("ops"), &owner).await.unwrap();
    env.dashboards
        .set_visibility(&view.id, Visibility::Link, &owner)
        .await
        .unwrap();
    env.dashboards
        .update(&view.id, titled("ops v2"), &owner)
        .await
        .unwrap();

    let published = env.publisher.views();
    assert_eq!(published.len(), 3);
    assert_eq!(published[0].visibility, Visibility::Private);
    assert_eq!(published[1].visibility, Visibility::Link);
    assert_eq!(published[2].title, "ops v2");
}
