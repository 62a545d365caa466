//! Collaborator grant management
//!
//! Per-dashboard ACL rows grant viewer or editor access beyond the
//! implicit owner. The owner never appears in their own ACL; ownership
//! is represented solely by the `owner` field.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use gridshare_core::collab::{AuditSink, UserDirectory};
use gridshare_core::error::{EngineError, EngineResult};
use gridshare_core::permissions;
use gridshare_core::store::DashboardStore;
use gridshare_core::types::{
    AccessLevel, AclEntry, Actor, AuditAction, AuditEvent, Dashboard, TargetType, UserId,
};

/// Orchestrates collaborator grant and revocation
pub struct AclManager {
    store: Arc<dyn DashboardStore>,
    directory: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
}

impl AclManager {
    pub fn new(
        store: Arc<dyn DashboardStore>,
        directory: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            directory,
            audit,
        }
    }

    /// Grant or replace a collaborator row; last write wins.
    ///
    /// Returns whether the persisted ACL actually changed.
    pub async fn upsert(
        &self,
        dashboard: &mut Dashboard,
        target: &UserId,
        access_level: AccessLevel,
        actor: &Actor,
    ) -> EngineResult<bool> {
        permissions::resolve(dashboard, Some(actor), false).require_manage_sharing()?;

        let target_user = self
            .directory
            .find_active_by_id(target)
            .await?
            .ok_or_else(|| {
                EngineError::Validation("target user not found or inactive".to_string())
            })?;

        if target_user.id == dashboard.owner {
            return Err(EngineError::Forbidden(
                "the owner already has full access and cannot appear in the ACL".to_string(),
            ));
        }

        let entry = AclEntry {
            user_id: target_user.id.clone(),
            access_level,
            granted_by: actor.user_id.clone(),
            granted_at: chrono::Utc::now(),
        };

        let before = dashboard.acl.clone();
        dashboard.acl.retain(|e| e.user_id != target_user.id);
        dashboard.acl.push(entry);

        if acl_members_equal(&before, &dashboard.acl) {
            dashboard.acl = before;
            return Ok(false);
        }

        self.store.replace(dashboard).await?;
        info!(
            dashboard_id = %dashboard.id,
            target_id = %target_user.id,
            access_level = access_level.as_str(),
            actor_id = %actor.user_id,
            "collaborator access granted"
        );
        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::AccessGranted,
                TargetType::Dashboard,
                dashboard.id.as_str(),
            )
            .with_metadata(json!({
                "target_user_id": target_user.id,
                "access_level": access_level.as_str(),
            })),
        )
        .await;
        Ok(true)
    }

    /// Remove a collaborator row; removing an absent entry succeeds
    /// without a write or an audit event.
    pub async fn revoke(
        &self,
        dashboard: &mut Dashboard,
        target: &UserId,
        actor: &Actor,
    ) -> EngineResult<bool> {
        permissions::resolve(dashboard, Some(actor), false).require_manage_sharing()?;

        if target == &dashboard.owner {
            return Err(EngineError::Forbidden(
                "the owner's access cannot be revoked".to_string(),
            ));
        }

        let before_len = dashboard.acl.len();
        dashboard.acl.retain(|e| &e.user_id != target);
        if dashboard.acl.len() == before_len {
            return Ok(false);
        }

        self.store.replace(dashboard).await?;
        info!(
            dashboard_id = %dashboard.id,
            target_id = %target,
            actor_id = %actor.user_id,
            "collaborator access revoked"
        );
        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::AccessRevoked,
                TargetType::Dashboard,
                dashboard.id.as_str(),
            )
            .with_metadata(json!({ "target_user_id": target })),
        )
        .await;
        Ok(true)
    }
}

/// Membership comparison ignoring grant provenance: re-granting the
/// same level is a no-op even though `granted_at` would differ.
fn acl_members_equal(a: &[AclEntry], b: &[AclEntry]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().all(|ea| {
        b.iter()
            .any(|eb| ea.user_id == eb.user_id && ea.access_level == eb.access_level)
    })
}
