//! Application-wide error types.
//!
//! `AppError` is the fixed taxonomy every failure is classified into before it
//! reaches a client. Lower layers keep their own typed errors and convert into
//! this one; only the HTTP layer renders it.

use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid identity assertion.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Authenticated, but no access (e.g. no active organization membership).
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The tenant context could not be propagated to the database session.
    #[error("RLS context error: {0}")]
    RlsContext(String),

    /// Database unreachable or failing.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) | Self::RlsContext(_) => 403,
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::Database(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::RlsContext(_) => "RLS_CONTEXT_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the detail text carried by the error.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::RlsContext(msg)
            | Self::Database(msg)
            | Self::Internal(msg) => msg,
        }
    }

    /// Returns true if the detail may leak server internals and must only be
    /// shown to clients in development builds.
    #[must_use]
    pub const fn has_sensitive_detail(&self) -> bool {
        matches!(
            self,
            Self::RlsContext(_) | Self::Database(_) | Self::Internal(_)
        )
    }

    /// Returns the client-facing message.
    ///
    /// Errors with sensitive details get a fixed message; the rest echo their
    /// detail.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::RlsContext(_) => "Unable to establish tenant context".to_string(),
            Self::Database(_) => "Database temporarily unavailable".to_string(),
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.detail().to_string(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
