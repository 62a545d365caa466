//! Outbound collaborator boundaries
//!
//! Read-only account lookup, fire-and-forget audit, and post-mutation
//! view publication. Audit and publish failures are logged and
//! swallowed by the engine; they never change an operation's outcome.

use async_trait::async_trait;

use crate::error::EngineResult;
use crate::types::{AuditEvent, User, UserId};
use crate::view::DashboardView;

/// Read-only account lookup
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve an id to a user, only if the account is active.
    async fn find_active_by_id(&self, id: &UserId) -> EngineResult<Option<User>>;

    /// Resolve a normalized email to a user, only if active.
    async fn find_active_by_email(&self, email: &str) -> EngineResult<Option<User>>;

    /// Live count of active admins, excluding one account.
    async fn count_active_admins_excluding(&self, excluding: &UserId) -> EngineResult<usize>;

    /// Oldest-registered active admin other than `excluding`, used to
    /// nominate a replacement owner during self-offboarding.
    async fn oldest_active_admin_excluding(&self, excluding: &UserId)
        -> EngineResult<Option<User>>;
}

/// Append-only audit stream, never read back for decisions
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> EngineResult<()>;
}

/// Post-mutation view fan-out to dashboard subscribers, at-least-once,
/// ordered by local commit order
#[async_trait]
pub trait ViewPublisher: Send + Sync {
    async fn publish(&self, view: &DashboardView) -> EngineResult<()>;
}
