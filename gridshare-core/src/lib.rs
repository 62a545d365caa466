//! Gridshare Core - access-control and sharing primitives
//!
//! This crate provides the domain types, external collaborator
//! boundaries and pure decision components of the sharing engine:
//! - Permission resolution for dashboard viewers
//! - The admin-quorum invariant guard
//! - The trusted-content payload gate
//! - Policy types with safe read-time normalization
//!
//! Orchestration (visibility lifecycle, ACL management, ownership
//! transfer, offboarding reconciliation) lives in `gridshare-engine`.

pub mod collab;
pub mod error;
pub mod permissions;
pub mod quorum;
pub mod store;
pub mod trust;
pub mod types;
pub mod view;

pub use error::{EngineError, EngineResult};
pub use permissions::PermissionSet;
pub use types::*;
pub use view::DashboardView;
