//! In-memory collaborator implementations
//!
//! Whole-document replacement under a single lock gives the same
//! atomicity the engine expects from a real document store: one
//! snapshot in, one snapshot out, last committer wins.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use tokio::sync::RwLock;

use gridshare_core::collab::{AuditSink, UserDirectory, ViewPublisher};
use gridshare_core::error::{EngineError, EngineResult};
use gridshare_core::store::{DashboardStore, PolicyOverrides, UserStore};
use gridshare_core::types::{AuditEvent, Dashboard, DashboardId, User, UserId};
use gridshare_core::view::DashboardView;

/// In-memory dashboard document store
#[derive(Default)]
pub struct MemoryDashboardStore {
    documents: RwLock<HashMap<String, Dashboard>>,
}

impl MemoryDashboardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DashboardStore for MemoryDashboardStore {
    async fn find(&self, id: &DashboardId) -> EngineResult<Option<Dashboard>> {
        Ok(self.documents.read().await.get(id.as_str()).cloned())
    }

    async fn find_by_share_token(&self, token: &str) -> EngineResult<Option<Dashboard>> {
        Ok(self
            .documents
            .read()
            .await
            .values()
            .find(|d| d.share_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> EngineResult<Vec<Dashboard>> {
        let mut hits: Vec<Dashboard> = self
            .documents
            .read()
            .await
            .values()
            .filter(|d| &d.owner == user_id || d.acl_entry(user_id).is_some())
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        Ok(hits)
    }

    async fn insert(&self, dashboard: &Dashboard) -> EngineResult<()> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(dashboard.id.as_str()) {
            return Err(EngineError::Storage(format!(
                "dashboard already exists: {}",
                dashboard.id
            )));
        }
        documents.insert(dashboard.id.as_str().to_string(), dashboard.clone());
        Ok(())
    }

    async fn replace(&self, dashboard: &Dashboard) -> EngineResult<()> {
        let mut documents = self.documents.write().await;
        if !documents.contains_key(dashboard.id.as_str()) {
            return Err(EngineError::Storage(format!(
                "dashboard vanished before replace: {}",
                dashboard.id
            )));
        }
        documents.insert(dashboard.id.as_str().to_string(), dashboard.clone());
        Ok(())
    }

    async fn delete(&self, id: &DashboardId) -> EngineResult<()> {
        self.documents.write().await.remove(id.as_str());
        Ok(())
    }
}

/// In-memory user store doubling as the read-only directory
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account, bypassing registration flows.
    pub async fn seed(&self, user: User) {
        self.users
            .write()
            .await
            .insert(user.id.as_str().to_string(), user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find(&self, id: &UserId) -> EngineResult<Option<User>> {
        Ok(self.users.read().await.get(id.as_str()).cloned())
    }

    async fn replace(&self, user: &User) -> EngineResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(user.id.as_str()) {
            return Err(EngineError::Storage(format!(
                "user vanished before replace: {}",
                user.id
            )));
        }
        users.insert(user.id.as_str().to_string(), user.clone());
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> EngineResult<()> {
        self.users.write().await.remove(id.as_str());
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryUserStore {
    async fn find_active_by_id(&self, id: &UserId) -> EngineResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .get(id.as_str())
            .filter(|u| u.active)
            .cloned())
    }

    async fn find_active_by_email(&self, email: &str) -> EngineResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.active && u.email == email)
            .cloned())
    }

    async fn count_active_admins_excluding(&self, excluding: &UserId) -> EngineResult<usize> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.is_active_admin() && &u.id != excluding)
            .count())
    }

    async fn oldest_active_admin_excluding(
        &self,
        excluding: &UserId,
    ) -> EngineResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.is_active_admin() && &u.id != excluding)
            .min_by(|a, b| {
                a.registered_at
                    .cmp(&b.registered_at)
                    .then_with(|| a.id.as_str().cmp(b.id.as_str()))
            })
            .cloned())
    }
}

/// In-memory policy override table
#[derive(Default)]
pub struct MemoryPolicyOverrides {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemoryPolicyOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyOverrides for MemoryPolicyOverrides {
    async fn load(&self) -> EngineResult<BTreeMap<String, String>> {
        Ok(self.values.read().await.clone())
    }

    async fn upsert(&self, key: &str, value: &str) -> EngineResult<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Audit sink that captures events for assertions
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: AuditEvent) -> EngineResult<()> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
        Ok(())
    }
}

/// Audit sink that always fails; mutations must still succeed
#[derive(Default)]
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _event: AuditEvent) -> EngineResult<()> {
        Err(EngineError::Storage("audit stream unavailable".to_string()))
    }
}

/// Publisher that captures published views in commit order
#[derive(Default)]
pub struct RecordingPublisher {
    views: Mutex<Vec<DashboardView>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn views(&self) -> Vec<DashboardView> {
        self.views.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl ViewPublisher for RecordingPublisher {
    async fn publish(&self, view: &DashboardView) -> EngineResult<()> {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(view.clone());
        Ok(())
    }
}

/// Publisher that drops every view
#[derive(Default)]
pub struct NoopPublisher;

#[async_trait]
impl ViewPublisher for NoopPublisher {
    async fn publish(&self, _view: &DashboardView) -> EngineResult<()> {
        Ok(())
    }
}
