//! Audit event types
//!
//! Events are append-only and write-only: the engine never reads them
//! back to make a decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::user::UserId;

/// Audit action vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DashboardCreated,
    DashboardUpdated,
    DashboardDeleted,
    VisibilityChanged,
    ShareTokenRotated,
    AccessGranted,
    AccessRevoked,
    OwnershipTransferred,
    OwnershipReassigned,
    UserUpdated,
    UserDeactivated,
    UserDeleted,
    PolicyChanged,
}

/// Audited entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Dashboard,
    User,
    Policy,
}

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor_user_id: UserId,
    pub action: AuditAction,
    pub target_type: TargetType,
    pub target_id: String,
    #[serde(default)]
    pub metadata: Value,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        actor: &UserId,
        action: AuditAction,
        target_type: TargetType,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            actor_user_id: actor.clone(),
            action,
            target_type,
            target_id: target_id.into(),
            metadata: Value::Null,
            at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
