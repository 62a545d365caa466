//! Visibility lifecycle
//!
//! All six pairwise transitions between private, link and public are
//! structurally legal. Only entering an external tier from private is
//! policy-gated and token-rotating; transitions among external tiers
//! keep the existing token, and returning to private clears it so the
//! token-presence invariant (`share_token` is Some exactly when the
//! dashboard is externally visible) always holds.

use tracing::debug;

use gridshare_core::error::{EngineError, EngineResult};
use gridshare_core::types::{Actor, Dashboard, PolicySnapshot, Visibility};

use crate::share_token;

/// Outcome of a visibility transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityOutcome {
    /// Requested tier equals the current one; nothing to persist
    Unchanged,
    Changed {
        token_rotated: bool,
    },
}

/// Orchestrates visibility transitions and share-token issuance
pub struct VisibilityLifecycle;

impl VisibilityLifecycle {
    /// Apply a visibility transition in memory.
    ///
    /// Admin actors bypass the publish-policy gate. Non-admin actors
    /// requesting an external tier need `editor_can_publish`.
    pub fn set_visibility(
        dashboard: &mut Dashboard,
        next: Visibility,
        actor: &Actor,
        policy: &PolicySnapshot,
    ) -> EngineResult<VisibilityOutcome> {
        let current = dashboard.visibility;
        if next == current {
            return Ok(VisibilityOutcome::Unchanged);
        }

        if next.is_external() && !actor.is_admin() && !policy.editor_can_publish {
            return Err(EngineError::Forbidden(
                "publishing dashboards is disabled for non-admin users".to_string(),
            ));
        }

        dashboard.visibility = next;
        let token_rotated = if next.is_external() {
            // Fresh token exactly when leaving private, or when a
            // malformed record carries none.
            if current == Visibility::Private || dashboard.share_token.is_none() {
                dashboard.share_token = Some(share_token::mint());
                true
            } else {
                false
            }
        } else {
            dashboard.share_token = None;
            false
        };

        debug!(
            dashboard_id = %dashboard.id,
            from = current.as_str(),
            to = next.as_str(),
            token_rotated,
            "visibility transition"
        );
        Ok(VisibilityOutcome::Changed { token_rotated })
    }

    /// Resolve the visibility of a dashboard being created.
    ///
    /// An explicit request for an unpermitted external tier fails
    /// loudly; an unpermitted external *default* silently downgrades to
    /// private. The asymmetry is deliberate: the caller never asked for
    /// exposure, so they get the safe tier without an error.
    pub fn resolve_create_visibility(
        requested: Option<Visibility>,
        actor: &Actor,
        policy: &PolicySnapshot,
    ) -> EngineResult<Visibility> {
        let can_publish = actor.is_admin() || policy.editor_can_publish;
        match requested {
            Some(vis) => {
                if vis.is_external() && !can_publish {
                    return Err(EngineError::Forbidden(
                        "publishing dashboards is disabled for non-admin users".to_string(),
                    ));
                }
                Ok(vis)
            }
            None => {
                let vis = policy.default_visibility;
                if vis.is_external() && !can_publish {
                    debug!(
                        actor_id = %actor.user_id,
                        default = vis.as_str(),
                        "downgrading default visibility to private"
                    );
                    Ok(Visibility::Private)
                } else {
                    Ok(vis)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gridshare_core::types::{PolicyDefaults, Role, UserId};

    fn policy(editor_can_publish: bool) -> PolicySnapshot {
        let mut snapshot = PolicySnapshot::from_defaults(&PolicyDefaults::default());
        snapshot.editor_can_publish = editor_can_publish;
        snapshot
    }

    fn editor() -> Actor {
        Actor {
            user_id: UserId::from("e1"),
            role: Role::Editor,
        }
    }

    fn admin() -> Actor {
        Actor {
            user_id: UserId::from("a1"),
            role: Role::Admin,
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(UserId::from("e1"), Utc::now())
    }

    #[test]
    fn private_to_public_mints_a_token() {
        let mut d = dashboard();
        let outcome =
            VisibilityLifecycle::set_visibility(&mut d, Visibility::Public, &editor(), &policy(true))
                .unwrap();
        assert_eq!(outcome, VisibilityOutcome::Changed { token_rotated: true });
        assert!(d.share_token.is_some());
    }

    #[test]
    fn public_to_link_keeps_the_token() {
        let mut d = dashboard();
        VisibilityLifecycle::set_visibility(&mut d, Visibility::Public, &editor(), &policy(true))
            .unwrap();
        let token = d.share_token.clone();

        let outcome =
            VisibilityLifecycle::set_visibility(&mut d, Visibility::Link, &editor(), &policy(true))
                .unwrap();
        assert_eq!(outcome, VisibilityOutcome::Changed { token_rotated: false });
        assert_eq!(d.share_token, token);
    }

    #[test]
    fn returning_to_private_clears_the_token() {
        let mut d = dashboard();
        VisibilityLifecycle::set_visibility(&mut d, Visibility::Link, &editor(), &policy(true))
            .unwrap();
        VisibilityLifecycle::set_visibility(&mut d, Visibility::Private, &editor(), &policy(true))
            .unwrap();
        assert_eq!(d.share_token, None);

        // Re-sharing later mints a token different from the first run's.
        VisibilityLifecycle::set_visibility(&mut d, Visibility::Link, &editor(), &policy(true))
            .unwrap();
        assert!(d.share_token.is_some());
    }

    #[test]
    fn same_tier_is_a_no_op() {
        let mut d = dashboard();
        let outcome = VisibilityLifecycle::set_visibility(
            &mut d,
            Visibility::Private,
            &editor(),
            &policy(false),
        )
        .unwrap();
        assert_eq!(outcome, VisibilityOutcome::Unchanged);
    }

    #[test]
    fn publish_policy_blocks_non_admins_only() {
        let mut d = dashboard();
        let err = VisibilityLifecycle::set_visibility(
            &mut d,
            Visibility::Public,
            &editor(),
            &policy(false),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        VisibilityLifecycle::set_visibility(&mut d, Visibility::Public, &admin(), &policy(false))
            .unwrap();
    }

    #[test]
    fn explicit_external_request_fails_loudly_without_publish_rights() {
        let err = VisibilityLifecycle::resolve_create_visibility(
            Some(Visibility::Public),
            &editor(),
            &policy(false),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    #[test]
    fn external_default_silently_downgrades_without_publish_rights() {
        let mut p = policy(false);
        p.default_visibility = Visibility::Public;

        let vis =
            VisibilityLifecycle::resolve_create_visibility(None, &editor(), &p).unwrap();
        assert_eq!(vis, Visibility::Private);

        let vis = VisibilityLifecycle::resolve_create_visibility(None, &admin(), &p).unwrap();
        assert_eq!(vis, Visibility::Public);
    }
}
