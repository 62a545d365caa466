//! Deployment policy service
//!
//! Reads merge persisted overrides over static defaults; every enum is
//! normalized case-insensitively and a bad persisted value degrades to
//! the default instead of failing the request. Writes are rejected
//! wholesale when the deployment-time edit lock is set, and each
//! provided key is validated strictly before anything is upserted.

use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use gridshare_core::collab::AuditSink;
use gridshare_core::error::{EngineError, EngineResult};
use gridshare_core::store::PolicyOverrides;
use gridshare_core::types::{
    keys, Actor, AuditAction, AuditEvent, ExecutionMode, PolicyDefaults, PolicySnapshot,
    PolicyUpdate, RegistrationMode, Role, TargetType,
};

/// Policy store with static fallback defaults
pub struct PolicyService {
    overrides: Arc<dyn PolicyOverrides>,
    defaults: PolicyDefaults,
    audit: Arc<dyn AuditSink>,
}

impl PolicyService {
    pub fn new(
        overrides: Arc<dyn PolicyOverrides>,
        defaults: PolicyDefaults,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            overrides,
            defaults,
            audit,
        }
    }

    /// Effective policy snapshot.
    pub async fn get(&self) -> EngineResult<PolicySnapshot> {
        let mut snapshot = PolicySnapshot::from_defaults(&self.defaults);
        let overrides = self.overrides.load().await?;

        for (key, value) in &overrides {
            match key.as_str() {
                keys::REGISTRATION_MODE => match RegistrationMode::parse_strict(value) {
                    Ok(mode) => snapshot.registration_mode = mode,
                    Err(_) => warn!(%key, %value, "ignoring malformed policy override"),
                },
                keys::REGISTRATION_DEFAULT_ROLE => match Role::parse_strict(value) {
                    Ok(role) => snapshot.registration_default_role = role,
                    Err(_) => warn!(%key, %value, "ignoring malformed policy override"),
                },
                keys::EDITOR_CAN_PUBLISH => match parse_bool(value) {
                    Some(flag) => snapshot.editor_can_publish = flag,
                    None => warn!(%key, %value, "ignoring malformed policy override"),
                },
                keys::EXECUTION_MODE => {
                    // Lenient on read: an unknown mode must degrade to
                    // safe, never to trusted.
                    snapshot.execution_mode = ExecutionMode::parse_lenient(value);
                }
                _ => warn!(%key, "ignoring unknown policy override"),
            }
        }

        Ok(snapshot)
    }

    /// Validate and upsert the provided keys, then return the new
    /// effective snapshot.
    pub async fn set(&self, update: PolicyUpdate, actor: &Actor) -> EngineResult<PolicySnapshot> {
        if self.defaults.policy_edit_lock {
            return Err(EngineError::Forbidden(
                "policy editing is locked for this deployment".to_string(),
            ));
        }
        if !actor.is_admin() {
            return Err(EngineError::Forbidden(
                "only administrators can change policy".to_string(),
            ));
        }
        if update.is_empty() {
            return Err(EngineError::Validation(
                "no policy keys provided".to_string(),
            ));
        }

        // Validate everything before writing anything.
        let registration_mode = update
            .registration_mode
            .as_deref()
            .map(RegistrationMode::parse_strict)
            .transpose()?;
        let default_role = update
            .registration_default_role
            .as_deref()
            .map(Role::parse_strict)
            .transpose()?;
        let execution_mode = update
            .execution_mode
            .as_deref()
            .map(ExecutionMode::parse_strict)
            .transpose()?;

        let mut changed: Vec<&str> = Vec::new();
        if let Some(mode) = registration_mode {
            self.overrides
                .upsert(keys::REGISTRATION_MODE, mode.as_str())
                .await?;
            changed.push(keys::REGISTRATION_MODE);
        }
        if let Some(role) = default_role {
            self.overrides
                .upsert(keys::REGISTRATION_DEFAULT_ROLE, role.as_str())
                .await?;
            changed.push(keys::REGISTRATION_DEFAULT_ROLE);
        }
        if let Some(flag) = update.editor_can_publish {
            self.overrides
                .upsert(keys::EDITOR_CAN_PUBLISH, if flag { "true" } else { "false" })
                .await?;
            changed.push(keys::EDITOR_CAN_PUBLISH);
        }
        if let Some(mode) = execution_mode {
            self.overrides
                .upsert(keys::EXECUTION_MODE, mode.as_str())
                .await?;
            changed.push(keys::EXECUTION_MODE);
        }

        crate::emit_audit(
            self.audit.as_ref(),
            AuditEvent::new(
                &actor.user_id,
                AuditAction::PolicyChanged,
                TargetType::Policy,
                "policy",
            )
            .with_metadata(json!({ "keys": changed })),
        )
        .await;

        self.get().await
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
