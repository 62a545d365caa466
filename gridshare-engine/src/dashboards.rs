//! Dashboard operations facade
//!
//! Every inbound dashboard operation lands here: loads one snapshot,
//! consults the pure components, writes one replacement, then emits
//! audit and publishes the post-mutation view. Read denial and true
//! absence both surface as the same generic not-found error.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use gridshare_core::collab::{AuditSink, UserDirectory, ViewPublisher};
use gridshare_core::error::{EngineError, EngineResult};
use gridshare_core::permissions::{self, PermissionSet};
use gridshare_core::store::DashboardStore;
use gridshare_core::trust::TrustedPayloadGate;
use gridshare_core::types::{
    AccessLevel, AclEntry, Actor, AuditAction, AuditEvent, Dashboard, DashboardId,
    DashboardPatch, Role, TargetType, UserId, Visibility,
};
use gridshare_core::view::DashboardView;

use crate::acl::AclManager;
use crate::ownership::OwnershipTransfer;
use crate::policy::PolicyService;
use crate::share_token;
use crate::visibility::{VisibilityLifecycle, VisibilityOutcome};

/// Dashboard operations service
pub struct DashboardService {
    store: Arc<dyn DashboardStore>,
    directory: Arc<dyn UserDirectory>,
    policy: Arc<PolicyService>,
    acl: AclManager,
    ownership: OwnershipTransfer,
    audit: Arc<dyn AuditSink>,
    publisher: Arc<dyn ViewPublisher>,
}

impl DashboardService {
    pub fn new(
        store: Arc<dyn DashboardStore>,
        directory: Arc<dyn UserDirectory>,
        policy: Arc<PolicyService>,
        audit: Arc<dyn AuditSink>,
        publisher: Arc<dyn ViewPublisher>,
    ) -> Self {
        let acl = AclManager::new(store.clone(), directory.clone(), audit.clone());
        let ownership = OwnershipTransfer::new(store.clone(), directory.clone(), audit.clone());
        Self {
            store,
            directory,
            policy,
            acl,
            ownership,
            audit,
            publisher,
        }
    }

    /// Permission-gated read by id, optionally presenting a share token.
    pub async fn read(
        &self,
        id: &DashboardId,
        viewer: Option<&Actor>,
        presented_token: Option<&str>,
    ) -> EngineResult<DashboardView> {
        let dashboard = self.load(id).await?;
        let token_matched =
            presented_token.is_some_and(|t| dashboard.share_token_matches(t));
        let perms = permissions::resolve(&dashboard, viewer, token_matched);
        perms.require_read()?;
        Ok(DashboardView::for_viewer(&dashboard, perms))
    }

    /// Unauthenticated read by bearer share token.
    pub async fn read_by_token(&self, token: &str) -> EngineResult<DashboardView> {
        let dashboard = self
            .store
            .find_by_share_token(token)
            .await?
            .ok_or_else(EngineError::not_found)?;
        let token_matched = dashboard.share_token_matches(token);
        let perms = permissions::resolve(&dashboard, None, token_matched);
        perms.require_read()?;
        Ok(DashboardView::for_viewer(&dashboard, perms))
    }

    /// Create a dashboard owned by the caller.
    pub async fn create(
        &self,
        payload: DashboardPatch,
        actor: &Actor,
    ) -> EngineResult<DashboardView> {
        let policy = self.policy.get().await?;
        let visibility =
            VisibilityLifecycle::resolve_create_visibility(payload.visibility, actor, &policy)?;

        let now = chrono::Utc::now();
        let mut dashboard = Dashboard::new(actor.user_id.clone(), now);
        payload.apply_to(&mut dashboard);
        dashboard.visibility = visibility;
        if visibility.is_external() {
            dashboard.share_token = Some(share_token::mint());
        }

        TrustedPayloadGate::check_create(policy.execution_mode, &dashboard)?;

        self.store.insert(&dashboard).await?;
        info!(
            dashboard_id = %dashboard.id,
            owner = %actor.user_id,
            visibility = visibility.as_str(),
            "dashboard created"
        );
        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::DashboardCreated,
                TargetType::Dashboard,
                dashboard.id.as_str(),
            )
            .with_metadata(json!({ "visibility": visibility.as_str() })),
        )
        .await;
        self.publish(&dashboard).await;

        let perms = permissions::resolve(&dashboard, Some(actor), false);
        Ok(DashboardView::for_viewer(&dashboard, perms))
    }

    /// Update allow-listed fields of an existing dashboard.
    pub async fn update(
        &self,
        id: &DashboardId,
        patch: DashboardPatch,
        actor: &Actor,
    ) -> EngineResult<DashboardView> {
        let mut dashboard = self.load(id).await?;
        permissions::resolve(&dashboard, Some(actor), false).require_edit()?;

        let policy = self.policy.get().await?;
        TrustedPayloadGate::check_update(policy.execution_mode, &patch, &dashboard)?;

        let before = dashboard.clone();
        let visibility_outcome = match patch.visibility {
            Some(next) => {
                VisibilityLifecycle::set_visibility(&mut dashboard, next, actor, &policy)?
            }
            None => VisibilityOutcome::Unchanged,
        };

        patch.apply_to(&mut dashboard);
        if dashboard == before {
            let perms = permissions::resolve(&dashboard, Some(actor), false);
            return Ok(DashboardView::for_viewer(&dashboard, perms));
        }

        dashboard.updated_at = chrono::Utc::now();
        self.store.replace(&dashboard).await?;

        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::DashboardUpdated,
                TargetType::Dashboard,
                dashboard.id.as_str(),
            ),
        )
        .await;
        if let VisibilityOutcome::Changed { token_rotated } = visibility_outcome {
            crate::emit_audit(
                self.audit.as_ref(),
                AuditEvent::new(
                    &actor.user_id,
                    AuditAction::VisibilityChanged,
                    TargetType::Dashboard,
                    dashboard.id.as_str(),
                )
                .with_metadata(json!({
                    "visibility": dashboard.visibility.as_str(),
                    "token_rotated": token_rotated,
                })),
            )
            .await;
        }
        self.publish(&dashboard).await;

        let perms = permissions::resolve(&dashboard, Some(actor), false);
        Ok(DashboardView::for_viewer(&dashboard, perms))
    }

    /// Change the exposure tier.
    pub async fn set_visibility(
        &self,
        id: &DashboardId,
        next: Visibility,
        actor: &Actor,
    ) -> EngineResult<DashboardView> {
        let mut dashboard = self.load(id).await?;
        let perms = permissions::resolve(&dashboard, Some(actor), false);
        perms.require_manage_sharing()?;

        let policy = self.policy.get().await?;
        let outcome = VisibilityLifecycle::set_visibility(&mut dashboard, next, actor, &policy)?;

        if let VisibilityOutcome::Changed { token_rotated } = outcome {
            dashboard.updated_at = chrono::Utc::now();
            self.store.replace(&dashboard).await?;
            crate::emit_audit(
                self.audit.as_ref(),
                AuditEvent::new(
                    &actor.user_id,
                    AuditAction::VisibilityChanged,
                    TargetType::Dashboard,
                    dashboard.id.as_str(),
                )
                .with_metadata(json!({
                    "visibility": next.as_str(),
                    "token_rotated": token_rotated,
                })),
            )
            .await;
            self.publish(&dashboard).await;
        }

        let perms = permissions::resolve(&dashboard, Some(actor), false);
        Ok(DashboardView::for_viewer(&dashboard, perms))
    }

    /// Invalidate the current share token and mint a fresh one.
    pub async fn rotate_share_token(
        &self,
        id: &DashboardId,
        actor: &Actor,
    ) -> EngineResult<DashboardView> {
        let mut dashboard = self.load(id).await?;
        let perms = permissions::resolve(&dashboard, Some(actor), false);
        perms.require_manage_sharing()?;

        if !dashboard.visibility.is_external() {
            return Err(EngineError::PreconditionFailed(
                "a private dashboard has no share token to rotate".to_string(),
            ));
        }

        dashboard.share_token = Some(share_token::mint());
        dashboard.updated_at = chrono::Utc::now();
        self.store.replace(&dashboard).await?;
        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::ShareTokenRotated,
                TargetType::Dashboard,
                dashboard.id.as_str(),
            ),
        )
        .await;
        self.publish(&dashboard).await;

        Ok(DashboardView::for_viewer(&dashboard, perms))
    }

    /// Grant or replace collaborator access, resolving the target by
    /// email.
    pub async fn upsert_access(
        &self,
        id: &DashboardId,
        email: &str,
        access_level: AccessLevel,
        actor: &Actor,
    ) -> EngineResult<Vec<AclEntry>> {
        let mut dashboard = self.load(id).await?;
        // Gate before the directory lookup: a caller without access must
        // get the same answer whether or not the target email exists.
        permissions::resolve(&dashboard, Some(actor), false).require_manage_sharing()?;

        let email = gridshare_core::types::normalize_email(email)?;
        let target = self
            .directory
            .find_active_by_email(&email)
            .await?
            .map(|u| u.id)
            .ok_or_else(|| {
                EngineError::Validation("no active user with that email address".to_string())
            })?;

        let changed = self
            .acl
            .upsert(&mut dashboard, &target, access_level, actor)
            .await?;
        if changed {
            self.publish(&dashboard).await;
        }
        Ok(dashboard.acl)
    }

    /// Remove collaborator access.
    pub async fn revoke_access(
        &self,
        id: &DashboardId,
        user_id: &UserId,
        actor: &Actor,
    ) -> EngineResult<Vec<AclEntry>> {
        let mut dashboard = self.load(id).await?;
        let changed = self.acl.revoke(&mut dashboard, user_id, actor).await?;
        if changed {
            self.publish(&dashboard).await;
        }
        Ok(dashboard.acl)
    }

    /// Reassign ownership.
    pub async fn transfer_ownership(
        &self,
        id: &DashboardId,
        new_owner: &UserId,
        actor: &Actor,
    ) -> EngineResult<DashboardView> {
        let mut dashboard = self.load(id).await?;
        let changed = self.ownership.transfer(&mut dashboard, new_owner, actor).await?;
        if changed {
            self.publish(&dashboard).await;
        }
        let perms = permissions::resolve(&dashboard, Some(actor), false);
        Ok(DashboardView::for_viewer(&dashboard, perms))
    }

    /// Delete a dashboard. Owner or admin only; editor collaborators
    /// cannot delete through this path.
    pub async fn delete(&self, id: &DashboardId, actor: &Actor) -> EngineResult<()> {
        let dashboard = self.load(id).await?;
        if !actor.is_admin() && actor.user_id != dashboard.owner {
            let perms = permissions::resolve(&dashboard, Some(actor), false);
            perms.require_read()?;
            return Err(EngineError::Forbidden(
                "only the owner or an administrator can delete a dashboard".to_string(),
            ));
        }

        self.store.delete(id).await?;
        info!(dashboard_id = %id, actor_id = %actor.user_id, "dashboard deleted");
        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::DashboardDeleted,
                TargetType::Dashboard,
                id.as_str(),
            ),
        )
        .await;
        Ok(())
    }

    /// Collaborator list, for viewers who can manage sharing.
    pub async fn list_collaborators(
        &self,
        id: &DashboardId,
        actor: &Actor,
    ) -> EngineResult<Vec<AclEntry>> {
        let dashboard = self.load(id).await?;
        permissions::resolve(&dashboard, Some(actor), false).require_manage_sharing()?;
        Ok(dashboard.acl)
    }

    async fn load(&self, id: &DashboardId) -> EngineResult<Dashboard> {
        self.store
            .find(id)
            .await?
            .ok_or_else(EngineError::not_found)
    }

    /// Post-mutation view published to subscribers; built with owner
    /// rights, the transport re-filters per subscriber.
    async fn publish(&self, dashboard: &Dashboard) {
        let owner = Actor {
            user_id: dashboard.owner.clone(),
            role: Role::Viewer,
        };
        let perms: PermissionSet = permissions::resolve(dashboard, Some(&owner), false);
        crate::publish_view(
            self.publisher.as_ref(),
            &DashboardView::for_viewer(dashboard, perms),
        )
        .await;
    }
}
