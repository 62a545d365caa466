//! Domain types for the sharing engine

mod audit;
mod dashboard;
mod policy;
mod user;

pub use audit::*;
pub use dashboard::*;
pub use policy::*;
pub use user::*;
