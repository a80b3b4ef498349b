//! Tenant resolution.
//!
//! Given an authenticated user, decides which organization (and optionally
//! which workspace) a request acts within.
//!
//! # Modules
//!
//! - `membership` - Organization membership domain type
//! - `hint` - Advisory session hints read from cookies
//! - `store` - The `MembershipStore` trait the resolver reads through
//! - `resolver` - Membership selection and the `SessionResolver` service

pub mod hint;
pub mod membership;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod resolver_props;

pub use hint::SessionHint;
pub use membership::Membership;
pub use resolver::{Resolution, ResolveError, SessionResolver, select_membership};
pub use store::{MembershipStore, StoreError};
