//! Shared harness for engine integration tests

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};

use gridshare_core::types::{Actor, PolicyDefaults, Role, User, UserId};
use gridshare_engine::dashboards::DashboardService;
use gridshare_engine::offboarding::OffboardingReconciler;
use gridshare_engine::policy::PolicyService;
use gridshare_engine::store::{
    MemoryDashboardStore, MemoryPolicyOverrides, MemoryUserStore, RecordingAuditSink,
    RecordingPublisher,
};
use gridshare_engine::users::UserAdminService;

static SEED_SEQ: AtomicI64 = AtomicI64::new(0);

pub struct Env {
    pub dashboards: DashboardService,
    pub users: UserAdminService,
    pub policy: Arc<PolicyService>,
    pub store: Arc<MemoryDashboardStore>,
    pub accounts: Arc<MemoryUserStore>,
    pub audit: Arc<RecordingAuditSink>,
    pub publisher: Arc<RecordingPublisher>,
    pub overrides: Arc<MemoryPolicyOverrides>,
}

impl Env {
    pub fn new() -> Self {
        Self::with_defaults(PolicyDefaults::default())
    }

    pub fn with_defaults(defaults: PolicyDefaults) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let store = Arc::new(MemoryDashboardStore::new());
        let accounts = Arc::new(MemoryUserStore::new());
        let audit = Arc::new(RecordingAuditSink::new());
        let publisher = Arc::new(RecordingPublisher::new());
        let overrides = Arc::new(MemoryPolicyOverrides::new());

        let policy = Arc::new(PolicyService::new(
            overrides.clone(),
            defaults,
            audit.clone(),
        ));
        let reconciler = Arc::new(OffboardingReconciler::new(
            store.clone(),
            accounts.clone(),
            audit.clone(),
            publisher.clone(),
        ));
        let dashboards = DashboardService::new(
            store.clone(),
            accounts.clone(),
            policy.clone(),
            audit.clone(),
            publisher.clone(),
        );
        let users = UserAdminService::new(
            accounts.clone(),
            accounts.clone(),
            reconciler,
            audit.clone(),
        );

        Self {
            dashboards,
            users,
            policy,
            store,
            accounts,
            audit,
            publisher,
            overrides,
        }
    }

    /// Seed an active account; registration order follows call order.
    pub async fn seed_user(&self, id: &str, role: Role) -> Actor {
        self.seed_user_with(id, role, true).await
    }

    pub async fn seed_user_with(&self, id: &str, role: Role, active: bool) -> Actor {
        let seq = SEED_SEQ.fetch_add(1, Ordering::SeqCst);
        let user = User {
            id: UserId::from(id),
            email: format!("{}@example.com", id),
            role,
            active,
            session_version: 0,
            registered_at: Utc
                .timestamp_opt(1_600_000_000 + seq, 0)
                .single()
                .expect("valid seed timestamp"),
            last_login: None,
        };
        let actor = Actor::from(&user);
        self.accounts.seed(user).await;
        actor
    }
}
