//! Read models returned to callers
//!
//! A view is the permission-filtered projection of a dashboard
//! snapshot: the bearer token and the collaborator list are only shown
//! to viewers who can manage sharing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::permissions::PermissionSet;
use crate::types::{AclEntry, Dashboard, DashboardId, DashboardSettings, Pane, UserId, Visibility};

/// Permission-filtered dashboard projection
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub id: DashboardId,
    pub owner: UserId,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Vec<AclEntry>>,
    pub title: String,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<u32>,
    pub datasources: Vec<Value>,
    pub panes: Vec<Pane>,
    pub auth_providers: Vec<Value>,
    pub settings: DashboardSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Effective rights of the viewer this projection was built for
    pub permissions: PermissionSet,
}

impl DashboardView {
    /// Project `dashboard` for a viewer holding `perms`.
    pub fn for_viewer(dashboard: &Dashboard, perms: PermissionSet) -> Self {
        let sharing_visible = perms.can_manage_sharing;
        Self {
            id: dashboard.id.clone(),
            owner: dashboard.owner.clone(),
            visibility: dashboard.visibility,
            share_token: if sharing_visible {
                dashboard.share_token.clone()
            } else {
                None
            },
            acl: if sharing_visible {
                Some(dashboard.acl.clone())
            } else {
                None
            },
            title: dashboard.title.clone(),
            version: dashboard.version,
            image: dashboard.image.clone(),
            width: dashboard.width,
            columns: dashboard.columns,
            datasources: dashboard.datasources.clone(),
            panes: dashboard.panes.clone(),
            auth_providers: dashboard.auth_providers.clone(),
            settings: dashboard.settings.clone(),
            created_at: dashboard.created_at,
            updated_at: dashboard.updated_at,
            permissions: perms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::resolve;
    use crate::types::{Actor, Role};

    #[test]
    fn token_and_acl_hidden_from_plain_readers() {
        let mut dashboard = Dashboard::new(UserId::from("owner"), Utc::now());
        dashboard.visibility = Visibility::Public;
        dashboard.share_token = Some("secret".to_string());

        let reader = resolve(&dashboard, None, false);
        let view = DashboardView::for_viewer(&dashboard, reader);
        assert!(view.share_token.is_none());
        assert!(view.acl.is_none());

        let owner = Actor {
            user_id: UserId::from("owner"),
            role: Role::Editor,
        };
        let view = DashboardView::for_viewer(&dashboard, resolve(&dashboard, Some(&owner), false));
        assert_eq!(view.share_token.as_deref(), Some("secret"));
        assert!(view.acl.is_some());
    }
}
