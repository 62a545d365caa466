//! Dashboard snapshot types
//!
//! A dashboard document is the unit of atomicity: every mutation loads a
//! snapshot, computes the next state in memory, and issues one replace.
//! Widget and pane settings are carried as opaque JSON; the engine only
//! inspects the narrow subset relevant to trust gating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::user::UserId;
use crate::error::{EngineError, EngineResult};

/// Opaque dashboard identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DashboardId(pub String);

impl DashboardId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DashboardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DashboardId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Exposure tier of a dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Link,
    Public,
}

impl Visibility {
    /// Strict parse, used at the inbound payload boundary.
    pub fn parse_strict(s: &str) -> EngineResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "private" => Ok(Visibility::Private),
            "link" => Ok(Visibility::Link),
            "public" => Ok(Visibility::Public),
            other => Err(EngineError::Validation(format!(
                "Invalid visibility: '{}'. Expected one of: private, link, public",
                other
            ))),
        }
    }

    /// Lenient parse for persisted records: unknown or malformed values
    /// collapse to `Private` so that a corrupted record can never widen
    /// exposure.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse_strict(s).unwrap_or(Visibility::Private)
    }

    /// Whether the tier is reachable without authentication.
    pub fn is_external(&self) -> bool {
        !matches!(self, Visibility::Private)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Private => "private",
            Visibility::Link => "link",
            Visibility::Public => "public",
        }
    }
}

impl<'de> Deserialize<'de> for Visibility {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Visibility::parse_lenient(&s))
    }
}

/// Collaborator access level (ownership is never an ACL row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Viewer,
    Editor,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Viewer => "viewer",
            AccessLevel::Editor => "editor",
        }
    }
}

/// Per-user collaborator grant, unique by `user_id` within a dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclEntry {
    pub user_id: UserId,
    pub access_level: AccessLevel,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
}

/// Widget inside a pane; settings are opaque except to the trust gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    #[serde(rename = "type")]
    pub widget_type: String,
    #[serde(default)]
    pub settings: Value,
}

/// Dashboard pane holding widgets; layout fields pass through untouched
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pane {
    #[serde(default)]
    pub widgets: Vec<Widget>,
    #[serde(flatten)]
    pub layout: serde_json::Map<String, Value>,
}

/// Dashboard-level settings; only script/style/resources are
/// trust-relevant, the rest passes through untouched
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Persisted dashboard snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub id: DashboardId,
    pub owner: UserId,
    #[serde(default)]
    pub visibility: Visibility,
    /// Present exactly when visibility is link or public
    #[serde(default)]
    pub share_token: Option<String>,
    #[serde(default)]
    pub acl: Vec<AclEntry>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub columns: Option<u32>,
    #[serde(default)]
    pub datasources: Vec<Value>,
    #[serde(default)]
    pub panes: Vec<Pane>,
    #[serde(default)]
    pub auth_providers: Vec<Value>,
    #[serde(default)]
    pub settings: DashboardSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Dashboard {
    /// Empty dashboard owned by `owner`, private until shared.
    pub fn new(owner: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: DashboardId::generate(),
            owner,
            visibility: Visibility::Private,
            share_token: None,
            acl: Vec::new(),
            title: String::new(),
            version: 0,
            image: None,
            width: None,
            columns: None,
            datasources: Vec::new(),
            panes: Vec::new(),
            auth_providers: Vec::new(),
            settings: DashboardSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Collaborator grant for a user, if any.
    pub fn acl_entry(&self, user_id: &UserId) -> Option<&AclEntry> {
        self.acl.iter().find(|e| &e.user_id == user_id)
    }

    /// Whether the given bearer token grants link access right now.
    pub fn share_token_matches(&self, token: &str) -> bool {
        self.visibility.is_external()
            && self
                .share_token
                .as_deref()
                .is_some_and(|t| !t.is_empty() && t == token)
    }
}

/// Inbound mutation payload for create/update.
///
/// This is the entire writable surface: owner, id, acl and share_token
/// have no fields here and can never be set through this path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Strict at this boundary: a request naming an unknown tier is an
    /// error, never a silent transition to private.
    #[serde(
        default,
        deserialize_with = "strict_visibility",
        skip_serializing_if = "Option::is_none"
    )]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datasources: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panes: Option<Vec<Pane>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_providers: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<DashboardSettings>,
}

fn strict_visibility<'de, D>(deserializer: D) -> Result<Option<Visibility>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    raw.map(|s| Visibility::parse_strict(&s).map_err(serde::de::Error::custom))
        .transpose()
}

impl DashboardPatch {
    /// Apply every allow-listed field except visibility, which is
    /// routed through the visibility lifecycle by the caller.
    pub fn apply_to(&self, dashboard: &mut Dashboard) {
        if let Some(title) = &self.title {
            dashboard.title = title.clone();
        }
        if let Some(version) = self.version {
            dashboard.version = version;
        }
        if let Some(image) = &self.image {
            dashboard.image = Some(image.clone());
        }
        if let Some(datasources) = &self.datasources {
            dashboard.datasources = datasources.clone();
        }
        if let Some(columns) = self.columns {
            dashboard.columns = Some(columns);
        }
        if let Some(panes) = &self.panes {
            dashboard.panes = panes.clone();
        }
        if let Some(width) = self.width {
            dashboard.width = Some(width);
        }
        if let Some(auth_providers) = &self.auth_providers {
            dashboard.auth_providers = auth_providers.clone();
        }
        if let Some(settings) = &self.settings {
            dashboard.settings = settings.clone();
        }
    }
}
