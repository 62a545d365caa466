//! Gridshare Engine - sharing orchestration services
//!
//! Services in this crate read a dashboard/user snapshot through the
//! store boundaries, consult the pure components in `gridshare-core`,
//! compute the next snapshot in memory and issue one atomic replace,
//! then emit an audit event and publish the post-mutation view.
//!
//! Audit and publish are fire-and-forget: their failures are logged
//! and swallowed, never surfaced to the caller.

pub mod acl;
pub mod dashboards;
pub mod offboarding;
pub mod ownership;
pub mod policy;
pub mod share_token;
pub mod store;
pub mod users;
pub mod visibility;

use tracing::warn;

use gridshare_core::collab::{AuditSink, ViewPublisher};
use gridshare_core::types::AuditEvent;
use gridshare_core::view::DashboardView;

pub(crate) async fn emit_audit(sink: &dyn AuditSink, event: AuditEvent) {
    if let Err(error) = sink.record(event).await {
        warn!(%error, "audit event dropped");
    }
}

pub(crate) async fn publish_view(publisher: &dyn ViewPublisher, view: &DashboardView) {
    if let Err(error) = publisher.publish(view).await {
        warn!(%error, dashboard_id = %view.id, "view publication dropped");
    }
}
