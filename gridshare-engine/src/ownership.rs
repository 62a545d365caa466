//! Ownership reassignment
//!
//! Transfer keeps the invariant that an owner never appears in their
//! own ACL: any pre-existing rows for the outgoing and incoming owner
//! are stripped, and the previous owner is re-inserted as an editor so
//! they keep working access to what they built.

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

/// Orchestrates owner reassignment
pub struct OwnershipTransfer {
    store: Arc<dyn DashboardStore>,
    directory: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
}

impl OwnershipTransfer {
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

    /// Reassign `dashboard` to `new_owner`.
    ///
    /// Only the current owner or an admin may transfer. Transferring to
    /// the current owner is an idempotent no-op. Returns whether a
    /// write was persisted.
    pub async fn transfer(
        &self,
        dashboard: &mut Dashboard,
        new_owner: &UserId,
        actor: &Actor,
    ) -> EngineResult<bool> {
        if !actor.is_admin() && actor.user_id != dashboard.owner {
            let perms = permissions::resolve(dashboard, Some(actor), false);
            perms.require_read()?;
            return Err(EngineError::Forbidden(
                "only the owner or an administrator can transfer ownership".to_string(),
            ));
        }

        if new_owner == &dashboard.owner {
            return Ok(false);
        }

        let new_owner_user = self
            .directory
            .find_active_by_id(new_owner)
            .await?
            .ok_or_else(|| {
                EngineError::Validation("new owner not found or inactive".to_string())
            })?;

        let previous_owner = dashboard.owner.clone();
        dashboard
            .acl
            .retain(|e| e.user_id != previous_owner && e.user_id != new_owner_user.id);
        dashboard.acl.push(AclEntry {
            user_id: previous_owner.clone(),
            access_level: AccessLevel::Editor,
            granted_by: actor.user_id.clone(),
            granted_at: chrono::Utc::now(),
        });
        dashboard.owner = new_owner_user.id.clone();
        dashboard.updated_at = chrono::Utc::now();

        self.store.replace(dashboard).await?;
        info!(
            dashboard_id = %dashboard.id,
            previous_owner = %previous_owner,
            new_owner = %dashboard.owner,
            actor_id = %actor.user_id,
            "ownership transferred"
        );
        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::OwnershipTransferred,
                TargetType::Dashboard,
                dashboard.id.as_str(),
            )
            .with_metadata(json!({
                "previous_owner": previous_owner,
                "new_owner": dashboard.owner,
            })),
        )
        .await;
        Ok(true)
    }
}
