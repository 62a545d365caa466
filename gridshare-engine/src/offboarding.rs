//! Offboarding reconciliation
//!
//! When a user account is permanently removed, every dashboard they own
//! must be reassigned and every ACL row referencing them stripped,
//! before the user row itself may be deleted. Each dashboard is one
//! independent atomic write whose next state depends only on its own
//! current persisted state, so a crash mid-run is safe to retry.

use serde_json::json;
use std::sync::Arc;
use tracing::info;

use gridshare_core::collab::{AuditSink, UserDirectory, ViewPublisher};
use gridshare_core::error::{EngineError, EngineResult};
use gridshare_core::permissions;
use gridshare_core::store::DashboardStore;
use gridshare_core::types::{
    Actor, AuditAction, AuditEvent, TargetType, UserId, Visibility,
};
use gridshare_core::view::DashboardView;

/// Summary of one reconciliation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OffboardReport {
    /// Dashboards whose ownership was reassigned
    pub reassigned: usize,
    /// Dashboards where only an ACL row was removed
    pub revoked: usize,
}

/// Orchestrates bulk dashboard reassignment and ACL cleanup for a user
/// being permanently removed
pub struct OffboardingReconciler {
    store: Arc<dyn DashboardStore>,
    directory: Arc<dyn UserDirectory>,
    audit: Arc<dyn AuditSink>,
    publisher: Arc<dyn ViewPublisher>,
}

impl OffboardingReconciler {
    pub fn new(
        store: Arc<dyn DashboardStore>,
        directory: Arc<dyn UserDirectory>,
        audit: Arc<dyn AuditSink>,
        publisher: Arc<dyn ViewPublisher>,
    ) -> Self {
        Self {
            store,
            directory,
            audit,
            publisher,
        }
    }

    /// Reassign and clean up every dashboard referencing `target`.
    ///
    /// Must run to completion and succeed before the caller deletes the
    /// user row. Fails `PreconditionFailed` before any write if the
    /// target owns dashboards and no usable replacement owner was
    /// nominated. A mid-loop write failure surfaces immediately;
    /// earlier writes stay committed and the run is safe to repeat.
    pub async fn reconcile(
        &self,
        target: &UserId,
        replacement: Option<&UserId>,
        actor: &Actor,
        reason: &str,
    ) -> EngineResult<OffboardReport> {
        let dashboards = self.store.list_for_user(target).await?;

        let owns_any = dashboards.iter().any(|d| &d.owner == target);
        let replacement_id = if owns_any {
            let id = replacement.ok_or_else(|| {
                EngineError::PreconditionFailed(
                    "a replacement owner is required: the departing user still owns dashboards"
                        .to_string(),
                )
            })?;
            let user = self.directory.find_active_by_id(id).await?.ok_or_else(|| {
                EngineError::PreconditionFailed(
                    "the nominated replacement owner is not an active user".to_string(),
                )
            })?;
            Some(user.id)
        } else {
            None
        };

        let mut report = OffboardReport::default();
        for mut dashboard in dashboards {
            if &dashboard.owner == target {
                let replacement_id = match replacement_id.as_ref() {
                    Some(id) => id.clone(),
                    None => {
                        return Err(EngineError::PreconditionFailed(
                            "a replacement owner is required: the departing user still owns \
                             dashboards"
                                .to_string(),
                        ))
                    }
                };

                let previous_visibility = dashboard.visibility;
                dashboard.owner = replacement_id.clone();
                dashboard.visibility = Visibility::Private;
                dashboard.share_token = None;
                dashboard
                    .acl
                    .retain(|e| &e.user_id != target && e.user_id != replacement_id);
                dashboard.updated_at = chrono::Utc::now();

                self.store.replace(&dashboard).await?;
                report.reassigned += 1;
                info!(
                    dashboard_id = %dashboard.id,
                    previous_owner = %target,
                    new_owner = %replacement_id,
                    reason,
                    "dashboard ownership reassigned during offboarding"
                );
                crate::emit_audit(
                    self.audit.as_ref(),
                    AuditEvent::new(
                        &actor.user_id,
                        AuditAction::OwnershipReassigned,
                        TargetType::Dashboard,
                        dashboard.id.as_str(),
                    )
                    .with_metadata(json!({
                        "previous_owner": target,
                        "new_owner": replacement_id,
                        "previous_visibility": previous_visibility.as_str(),
                        "reason": reason,
                    })),
                )
                .await;
                self.publish(&dashboard).await;
            } else if dashboard.acl_entry(target).is_some() {
                dashboard.acl.retain(|e| &e.user_id != target);
                dashboard.updated_at = chrono::Utc::now();

                self.store.replace(&dashboard).await?;
                report.revoked += 1;
                info!(
                    dashboard_id = %dashboard.id,
                    target_id = %target,
                    reason,
                    "collaborator access revoked during offboarding"
                );
                crate::emit_audit(
                    self.audit.as_ref(),
                    AuditEvent::new(
                        &actor.user_id,
                        AuditAction::AccessRevoked,
                        TargetType::Dashboard,
                        dashboard.id.as_str(),
                    )
                    .with_metadata(json!({
                        "target_user_id": target,
                        "reason": reason,
                    })),
                )
                .await;
                self.publish(&dashboard).await;
            }
        }

        Ok(report)
    }

    async fn publish(&self, dashboard: &gridshare_core::types::Dashboard) {
        let owner = Actor {
            user_id: dashboard.owner.clone(),
            role: gridshare_core::types::Role::Viewer,
        };
        let perms = permissions::resolve(dashboard, Some(&owner), false);
        crate::publish_view(
            self.publisher.as_ref(),
            &DashboardView::for_viewer(dashboard, perms),
        )
        .await;
    }
}
