//! Common types used across the application.

pub mod id;
pub mod tenant;

pub use id::*;
pub use tenant::{Principal, ResolvedContext, Role, UnknownRole};
