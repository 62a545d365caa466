//! Account administration
//!
//! Role and activation changes bump the session version so outstanding
//! sessions die with the old privileges. Deletion always runs as
//! deactivate, reconcile dashboards, then drop the row; the quorum
//! guard runs before any of it so the platform can never lose its last
//! active administrator.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use gridshare_core::collab::{AuditSink, UserDirectory};
use gridshare_core::error::{EngineError, EngineResult};
use gridshare_core::quorum::AdminQuorumGuard;
use gridshare_core::store::UserStore;
use gridshare_core::types::{
    Actor, AuditAction, AuditEvent, Role, TargetType, User, UserId,
};

use crate::offboarding::OffboardingReconciler;

const SELF_OFFBOARDING: &str = "self_offboarding";
const ADMIN_REMOVAL: &str = "admin_removal";

/// Administrative user operations
pub struct UserAdminService {
    users: Arc<dyn UserStore>,
    directory: Arc<dyn UserDirectory>,
    quorum: AdminQuorumGuard,
    reconciler: Arc<OffboardingReconciler>,
    audit: Arc<dyn AuditSink>,
}

impl UserAdminService {
    pub fn new(
        users: Arc<dyn UserStore>,
        directory: Arc<dyn UserDirectory>,
        reconciler: Arc<OffboardingReconciler>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let quorum = AdminQuorumGuard::new(directory.clone());
        Self {
            users,
            directory,
            quorum,
            reconciler,
            audit,
        }
    }

    /// Change a user's role and/or active flag.
    pub async fn admin_update(
        &self,
        target: &UserId,
        role: Option<Role>,
        active: Option<bool>,
        actor: &Actor,
    ) -> EngineResult<User> {
        if !actor.is_admin() {
            return Err(EngineError::Forbidden(
                "only administrators can manage accounts".to_string(),
            ));
        }

        let mut user = self
            .users
            .find(target)
            .await?
            .ok_or_else(|| EngineError::NotFound("user not found".to_string()))?;

        let demotes = role.is_some_and(|r| r != Role::Admin);
        let deactivates = active == Some(false);
        if &actor.user_id == target && (demotes || deactivates) {
            return Err(EngineError::Forbidden(
                "administrators cannot demote or deactivate their own account".to_string(),
            ));
        }

        let next_role = role.unwrap_or(user.role);
        let next_active = active.unwrap_or(user.active);
        if next_role == user.role && next_active == user.active {
            return Ok(user);
        }

        // Stripping the last active admin's role or deactivating them
        // would orphan the deployment.
        if user.is_active_admin() && (next_role != Role::Admin || !next_active) {
            self.quorum.ensure_quorum(target).await?;
        }

        user.role = next_role;
        user.active = next_active;
        user.bump_session();
        self.users.replace(&user).await?;
        info!(
            target_id = %target,
            role = next_role.as_str(),
            active = next_active,
            actor_id = %actor.user_id,
            "user account updated"
        );
        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::UserUpdated,
                TargetType::User,
                target.as_str(),
            )
            .with_metadata(json!({
                "role": next_role.as_str(),
                "active": next_active,
            })),
        )
        .await;
        Ok(user)
    }

    /// Permanently remove another account. The acting admin inherits
    /// any dashboards the target still owns.
    pub async fn admin_delete(&self, target: &UserId, actor: &Actor) -> EngineResult<()> {
        if !actor.is_admin() {
            return Err(EngineError::Forbidden(
                "only administrators can delete accounts".to_string(),
            ));
        }
        if &actor.user_id == target {
            return self.self_delete(actor).await;
        }

        let user = self
            .users
            .find(target)
            .await?
            .ok_or_else(|| EngineError::NotFound("user not found".to_string()))?;

        if user.is_active_admin() {
            self.quorum.ensure_quorum(target).await?;
        }

        self.remove_account(user, Some(actor.user_id.clone()), actor, ADMIN_REMOVAL)
            .await
    }

    /// Permanently remove the calling account. The oldest-registered
    /// other active admin inherits any dashboards the caller owns.
    pub async fn self_delete(&self, actor: &Actor) -> EngineResult<()> {
        let user = self
            .users
            .find(&actor.user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound("user not found".to_string()))?;

        if user.is_active_admin() {
            self.quorum.ensure_quorum(&actor.user_id).await?;
        }

        let replacement = self
            .directory
            .oldest_active_admin_excluding(&actor.user_id)
            .await?
            .map(|admin| admin.id);

        self.remove_account(user, replacement, actor, SELF_OFFBOARDING)
            .await
    }

    /// Deactivate, reconcile dashboards, then drop the user row.
    ///
    /// Reconciliation must succeed before the row is deleted; if it
    /// fails the account stays deactivated but present, and the whole
    /// operation is safe to retry.
    async fn remove_account(
        &self,
        mut user: User,
        replacement: Option<UserId>,
        actor: &Actor,
        reason: &str,
    ) -> EngineResult<()> {
        let target = user.id.clone();

        if user.active {
            user.active = false;
            user.bump_session();
            self.users.replace(&user).await?;
            crate::emit_audit(
                self.audit.as_ref(),
                AuditEvent::new(
                    &actor.user_id,
                    AuditAction::UserDeactivated,
                    TargetType::User,
                    target.as_str(),
                ),
            )
            .await;
        }

        let report = self
            .reconciler
            .reconcile(&target, replacement.as_ref(), actor, reason)
            .await?;

        self.users.delete(&target).await?;
        info!(
            target_id = %target,
            reassigned = report.reassigned,
            revoked = report.revoked,
            reason,
            actor_id = %actor.user_id,
            "user account deleted"
        );
        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::UserDeleted,
                TargetType::User,
                target.as_str(),
            )
            .with_metadata(json!({
                "reason": reason,
                "dashboards_reassigned": report.reassigned,
                "acl_rows_revoked": report.revoked,
            })),
        )
        .await;
        Ok(())
    }
}
