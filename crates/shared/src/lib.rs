//! Shared types, errors, and configuration for Keystone.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs and tenant context types
//! - The application-wide error taxonomy
//! - Configuration management
//! - Identity assertion verification and bridge token issuance

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::{BridgeClaims, BridgeToken, IdentityClaims};
pub use config::{AppConfig, AuthConfig, BridgeConfig, SessionConfig};
pub use error::AppError;
pub use jwt::{BRIDGE_TOKEN_TTL_HOURS, JwtError, JwtService, TokenBridge};
pub use types::{OrganizationId, Principal, ResolvedContext, Role, UserId, WorkspaceId};
