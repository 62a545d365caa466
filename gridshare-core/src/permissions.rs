//! Effective-rights resolution
//!
//! Pure function of a dashboard snapshot, an optional authenticated
//! actor, and whether a presented share token matched. No storage is
//! consulted here; callers load the snapshot first.

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::types::{AccessLevel, Actor, Dashboard, Visibility};

/// Effective rights of a viewer against one dashboard snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PermissionSet {
    pub can_read: bool,
    pub can_edit: bool,
    pub can_manage_sharing: bool,
    pub can_delete: bool,
    pub is_owner: bool,
}

impl PermissionSet {
    const NONE: Self = Self {
        can_read: false,
        can_edit: false,
        can_manage_sharing: false,
        can_delete: false,
        is_owner: false,
    };

    const ALL: Self = Self {
        can_read: true,
        can_edit: true,
        can_manage_sharing: true,
        can_delete: true,
        is_owner: true,
    };

    /// Read gate: denial is indistinguishable from absence.
    pub fn require_read(&self) -> EngineResult<()> {
        if self.can_read {
            Ok(())
        } else {
            Err(EngineError::not_found())
        }
    }

    /// Edit gate; readers who cannot edit get an explicit refusal.
    pub fn require_edit(&self) -> EngineResult<()> {
        self.require_read()?;
        if self.can_edit {
            Ok(())
        } else {
            Err(EngineError::Forbidden(
                "you do not have edit access to this dashboard".to_string(),
            ))
        }
    }

    /// Sharing-management gate.
    pub fn require_manage_sharing(&self) -> EngineResult<()> {
        self.require_read()?;
        if self.can_manage_sharing {
            Ok(())
        } else {
            Err(EngineError::Forbidden(
                "you do not have sharing access to this dashboard".to_string(),
            ))
        }
    }
}

/// Compute effective rights for `viewer` against `dashboard`.
///
/// Admin role or ownership grants everything. An editor-level ACL entry
/// grants edit, sharing management and delete, but never ownership
/// rights. Read additionally follows the exposure tier: public is
/// world-readable, link is readable when the presented token matched.
pub fn resolve(
    dashboard: &Dashboard,
    viewer: Option<&Actor>,
    share_token_matched: bool,
) -> PermissionSet {
    let mut perms = PermissionSet::NONE;

    if let Some(actor) = viewer {
        if actor.is_admin() || actor.user_id == dashboard.owner {
            let mut all = PermissionSet::ALL;
            all.is_owner = actor.user_id == dashboard.owner;
            return all;
        }

        match dashboard.acl_entry(&actor.user_id).map(|e| e.access_level) {
            Some(AccessLevel::Editor) => {
                perms.can_read = true;
                perms.can_edit = true;
                perms.can_manage_sharing = true;
                perms.can_delete = true;
            }
            Some(AccessLevel::Viewer) => {
                perms.can_read = true;
            }
            None => {}
        }
    }

    match dashboard.visibility {
        Visibility::Public => perms.can_read = true,
        Visibility::Link if share_token_matched => perms.can_read = true,
        _ => {}
    }

    perms
}
