//! Store bindings
//!
//! The engine talks to storage through the boundaries declared in
//! `gridshare-core::store` and `gridshare-core::collab`. This module
//! ships the in-memory binding used by tests and by embedders that do
//! not need durable storage.

mod memory;

pub use memory::*;
