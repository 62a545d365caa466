//! User account types
//!
//! The engine never creates accounts; it reads them through the
//! `UserDirectory` boundary and mutates them through `UserStore` when
//! roles change or an account is offboarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, EngineResult};

/// Opaque user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Platform role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Editor,
    Admin,
}

impl Role {
    /// Strict parse, used when validating policy writes.
    pub fn parse_strict(s: &str) -> EngineResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            other => Err(EngineError::Validation(format!(
                "Invalid role: '{}'. Expected one of: viewer, editor, admin",
                other
            ))),
        }
    }

    /// Lenient parse for persisted values; unknown strings fall back to
    /// the least-privileged role.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse_strict(s).unwrap_or(Role::Viewer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
        }
    }
}

/// User account snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique, stored trimmed and lowercased
    pub email: String,
    pub role: Role,
    pub active: bool,
    /// Session revocation marker, bumped on every role/active change
    pub session_version: u64,
    pub registered_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_active_admin(&self) -> bool {
        self.active && self.role == Role::Admin
    }

    /// Invalidate every outstanding session for this account.
    pub fn bump_session(&mut self) {
        self.session_version += 1;
    }
}

/// Normalize an email address for lookup and storage.
///
/// Only shape is checked here; deliverability is not this engine's
/// concern.
pub fn normalize_email(raw: &str) -> EngineResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(EngineError::Validation(format!(
            "Invalid email address: '{}'",
            raw.trim()
        )));
    }
    Ok(email)
}

/// Authenticated principal performing an operation.
///
/// Anonymous viewers are represented as the absence of an actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            role: user.role,
        }
    }
}
