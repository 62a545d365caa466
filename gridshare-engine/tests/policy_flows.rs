//! Policy store and create-visibility flows

mod common;

use common::Env;
use gridshare_core::error::EngineError;
use gridshare_core::store::PolicyOverrides;
use gridshare_core::types::{
    DashboardPatch, ExecutionMode, PolicyDefaults, PolicyUpdate, RegistrationMode, Role,
    Visibility,
};

#[tokio::test]
async fn overrides_merge_over_defaults_and_validate_on_write() {
    let env = Env::new();
    let admin = env.seed_user("root", Role::Admin).await;

    let snapshot = env.policy.get().await.unwrap();
    assert_eq!(snapshot.registration_mode, RegistrationMode::Open);
    assert_eq!(snapshot.execution_mode, ExecutionMode::Safe);

    let snapshot = env
        .policy
        .set(
            PolicyUpdate {
                registration_mode: Some("Invite".to_string()),
                editor_can_publish: Some(false),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap();
    assert_eq!(snapshot.registration_mode, RegistrationMode::Invite);
    assert!(!snapshot.editor_can_publish);

    // Unknown enum values are rejected at write time, not coerced.
    let err = env
        .policy
        .set(
            PolicyUpdate {
                execution_mode: Some("yolo".to_string()),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn malformed_persisted_override_degrades_on_read() {
    let env = Env::new();

    // Something wrote garbage behind the service's back.
    env.overrides
        .upsert("execution_mode", "definitely_trusted")
        .await
        .unwrap();
    env.overrides
        .upsert("registration_mode", "anyone")
        .await
        .unwrap();

    let snapshot = env.policy.get().await.unwrap();
    assert_eq!(snapshot.execution_mode, ExecutionMode::Safe);
    assert_eq!(snapshot.registration_mode, RegistrationMode::Open);
}

#[tokio::test]
async fn policy_edit_lock_rejects_all_writes() {
    let defaults = PolicyDefaults {
        policy_edit_lock: true,
        ..Default::default()
    };
    let env = Env::with_defaults(defaults);
    let admin = env.seed_user("root", Role::Admin).await;

    let err = env
        .policy
        .set(
            PolicyUpdate {
                editor_can_publish: Some(false),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn non_admins_cannot_change_policy() {
    let env = Env::new();
    let editor = env.seed_user("editor", Role::Editor).await;

    let err = env
        .policy
        .set(
            PolicyUpdate {
                editor_can_publish: Some(false),
                ..Default::default()
            },
            &editor,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn explicit_publish_request_fails_loudly_default_downgrades_silently() {
    let defaults = PolicyDefaults {
        editor_can_publish: false,
        default_visibility: Visibility::Public,
        ..Default::default()
    };
    let env = Env::with_defaults(defaults);
    let editor = env.seed_user("editor", Role::Editor).await;
    let admin = env.seed_user("root", Role::Admin).await;

    // Explicit request for an unpermitted external tier fails.
    let err = env
        .dashboards
        .create(
            DashboardPatch {
                visibility: Some(Visibility::Public),
                ..Default::default()
            },
            &editor,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    // The same tier as an unrequested default silently downgrades.
    let view = env
        .dashboards
        .create(DashboardPatch::default(), &editor)
        .await
        .unwrap();
    assert_eq!(view.visibility, Visibility::Private);
    assert!(view.share_token.is_none());

    // Admins get the external default, token included.
    let view = env
        .dashboards
        .create(DashboardPatch::default(), &admin)
        .await
        .unwrap();
    assert_eq!(view.visibility, Visibility::Public);
    assert!(view.share_token.is_some());
}

#[tokio::test]
async fn publish_policy_gates_visibility_changes_for_non_admins() {
    let env = Env::new();
    let admin = env.seed_user("root", Role::Admin).await;
    let editor = env.seed_user("editor", Role::Editor).await;

    let view = env
        .dashboards
        .create(DashboardPatch::default(), &editor)
        .await
        .unwrap();

    env.policy
        .set(
            PolicyUpdate {
                editor_can_publish: Some(false),
                ..Default::default()
            },
            &admin,
        )
        .await
        .unwrap();

    let err = env
        .dashboards
        .set_visibility(&view.id, Visibility::Link, &editor)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    // Admin bypasses the gate on someone else's dashboard.
    let shared = env
        .dashboards
        .set_visibility(&view.id, Visibility::Link, &admin)
        .await
        .unwrap();
    assert_eq!(shared.visibility, Visibility::Link);
}
