//! Core tenancy logic for Keystone.
//!
//! This crate contains the pure tenant-resolution logic with ZERO web or
//! database dependencies. Storage is reached through the `MembershipStore`
//! trait, implemented by `keystone-db`.
//!
//! # Modules
//!
//! - `tenancy` - Memberships, session hints and the session resolver

pub mod tenancy;
