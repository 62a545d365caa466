//! Document store boundaries
//!
//! The engine assumes an external document store offering atomic
//! per-document read/replace/delete keyed by id. No multi-document
//! transactions: every mutation is "read snapshot, compute next state,
//! one atomic replace". Concurrent writers may overwrite each other
//! (last-committer-wins); that is the guarantee callers get, nothing
//! stronger.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::error::EngineResult;
use crate::types::{Dashboard, DashboardId, User, UserId};

/// Dashboard document store
#[async_trait]
pub trait DashboardStore: Send + Sync {
    async fn find(&self, id: &DashboardId) -> EngineResult<Option<Dashboard>>;

    /// Lookup by bearer token, used for unauthenticated link reads.
    async fn find_by_share_token(&self, token: &str) -> EngineResult<Option<Dashboard>>;

    /// Every dashboard where the user is the owner or an ACL member.
    async fn list_for_user(&self, user_id: &UserId) -> EngineResult<Vec<Dashboard>>;

    async fn insert(&self, dashboard: &Dashboard) -> EngineResult<()>;

    /// Atomic whole-document replace keyed by `dashboard.id`.
    async fn replace(&self, dashboard: &Dashboard) -> EngineResult<()>;

    async fn delete(&self, id: &DashboardId) -> EngineResult<()>;
}

/// User document store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find(&self, id: &UserId) -> EngineResult<Option<User>>;
    async fn replace(&self, user: &User) -> EngineResult<()>;
    async fn delete(&self, id: &UserId) -> EngineResult<()>;
}

/// Persisted policy overrides, keyed by policy name.
///
/// Values are canonical lowercase strings; merging over static defaults
/// and validation live in the policy service, not here.
#[async_trait]
pub trait PolicyOverrides: Send + Sync {
    async fn load(&self) -> EngineResult<BTreeMap<String, String>>;
    async fn upsert(&self, key: &str, value: &str) -> EngineResult<()>;
}
