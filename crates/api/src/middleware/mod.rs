//! Request middleware and extractors.

pub mod auth;
pub mod tenant;

pub use auth::{AuthUser, auth_middleware};
pub use tenant::{TenantContext, TenantScope, tenant_middleware};
