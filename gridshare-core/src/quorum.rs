//! Admin quorum guard
//!
//! System-wide invariant: at least one active administrator must exist
//! at all times. The guard performs a live count at call time; two
//! concurrent "deactivate the last two admins" requests can both pass
//! before either write commits. That narrow race is accepted, not
//! locked against.

use std::sync::Arc;
use tracing::debug;

use crate::collab::UserDirectory;
use crate::error::{EngineError, EngineResult};
use crate::types::UserId;

/// Actionable message returned on quorum violations, unlike the
/// deliberately generic read-denial message.
pub const QUORUM_MESSAGE: &str =
    "at least one other active administrator is required before this account can be \
     removed or demoted";

/// Guard for the "at least one active admin" invariant
pub struct AdminQuorumGuard {
    directory: Arc<dyn UserDirectory>,
}

impl AdminQuorumGuard {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Fail unless at least one active admin other than `excluding`
    /// exists right now.
    pub async fn ensure_quorum(&self, excluding: &UserId) -> EngineResult<()> {
        let remaining = self
            .directory
            .count_active_admins_excluding(excluding)
            .await?;
        debug!(excluding = %excluding, remaining, "admin quorum check");
        if remaining == 0 {
            return Err(EngineError::PreconditionFailed(QUORUM_MESSAGE.to_string()));
        }
        Ok(())
    }
}
