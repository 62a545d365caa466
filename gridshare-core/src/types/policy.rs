//! Deployment policy types
//!
//! Policy values are persisted as string overrides and merged over
//! static defaults at read time. Writes validate strictly; reads
//! normalize leniently so a bad persisted value degrades to the safe
//! default instead of failing every request.

use serde::{Deserialize, Serialize};

use super::dashboard::Visibility;
use super::user::Role;
use crate::error::{EngineError, EngineResult};

/// Persisted policy override keys
pub mod keys {
    pub const REGISTRATION_MODE: &str = "registration_mode";
    pub const REGISTRATION_DEFAULT_ROLE: &str = "registration_default_role";
    pub const EDITOR_CAN_PUBLISH: &str = "editor_can_publish";
    pub const EXECUTION_MODE: &str = "execution_mode";
}

/// How new accounts enter the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    Open,
    Invite,
    Closed,
}

impl RegistrationMode {
    pub fn parse_strict(s: &str) -> EngineResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "invite" => Ok(Self::Invite),
            "closed" => Ok(Self::Closed),
            other => Err(EngineError::Validation(format!(
                "Invalid registration_mode: '{}'. Expected one of: open, invite, closed",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Invite => "invite",
            Self::Closed => "closed",
        }
    }
}

/// Deployment-wide trust switch for embedded executable content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Embedded script/resources may not be introduced or altered
    Safe,
    /// Embedded script/resources are allowed unconditionally
    Trusted,
}

impl ExecutionMode {
    pub fn parse_strict(s: &str) -> EngineResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(Self::Safe),
            "trusted" => Ok(Self::Trusted),
            other => Err(EngineError::Validation(format!(
                "Invalid execution_mode: '{}'. Expected one of: safe, trusted",
                other
            ))),
        }
    }

    /// Unknown persisted values fall back to the restrictive mode.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse_strict(s).unwrap_or(Self::Safe)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Trusted => "trusted",
        }
    }
}

/// Static fallback configuration, fixed at deployment time.
///
/// `policy_edit_lock` and `default_visibility` exist only here; they are
/// never persisted and cannot be changed through the policy write path.
#[derive(Debug, Clone)]
pub struct PolicyDefaults {
    pub registration_mode: RegistrationMode,
    pub registration_default_role: Role,
    pub editor_can_publish: bool,
    pub execution_mode: ExecutionMode,
    pub default_visibility: Visibility,
    pub policy_edit_lock: bool,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            registration_mode: RegistrationMode::Open,
            registration_default_role: Role::Editor,
            editor_can_publish: true,
            execution_mode: ExecutionMode::Safe,
            default_visibility: Visibility::Private,
            policy_edit_lock: false,
        }
    }
}

/// Effective policy: persisted overrides merged over static defaults
#[derive(Debug, Clone, Serialize)]
pub struct PolicySnapshot {
    pub registration_mode: RegistrationMode,
    pub registration_default_role: Role,
    pub editor_can_publish: bool,
    pub execution_mode: ExecutionMode,
    pub default_visibility: Visibility,
    pub policy_edit_lock: bool,
}

impl PolicySnapshot {
    pub fn from_defaults(defaults: &PolicyDefaults) -> Self {
        Self {
            registration_mode: defaults.registration_mode,
            registration_default_role: defaults.registration_default_role,
            editor_can_publish: defaults.editor_can_publish,
            execution_mode: defaults.execution_mode,
            default_visibility: defaults.default_visibility,
            policy_edit_lock: defaults.policy_edit_lock,
        }
    }
}

/// Partial policy write; enum-valued keys arrive as strings and are
/// validated strictly before anything is persisted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyUpdate {
    #[serde(default)]
    pub registration_mode: Option<String>,
    #[serde(default)]
    pub registration_default_role: Option<String>,
    #[serde(default)]
    pub editor_can_publish: Option<bool>,
    #[serde(default)]
    pub execution_mode: Option<String>,
}

impl PolicyUpdate {
    pub fn is_empty(&self) -> bool {
        self.registration_mode.is_none()
            && self.registration_default_role.is_none()
            && self.editor_can_publish.is_none()
            && self.execution_mode.is_none()
    }
}
