//! JWT verification of identity assertions and issuance of bridge tokens.
//!
//! Two independent keys are involved: the identity provider's secret, used
//! only to verify inbound assertions, and the bridge secret, used to sign
//! tokens handed to the secondary data-access client.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use thiserror::Error;

use crate::auth::{BridgeClaims, BridgeToken, IdentityClaims};
use crate::config::{AuthConfig, BridgeConfig};
use crate::types::{Principal, ResolvedContext, UserId};

/// Lifetime of bridge tokens.
pub const BRIDGE_TOKEN_TTL_HOURS: i64 = 24;

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token signature or audience is invalid.
    #[error("invalid token")]
    Invalid,

    /// The principal does not own the context a token was requested for.
    #[error("principal {principal} does not match context user {context}")]
    SubjectMismatch {
        /// The authenticated principal.
        principal: UserId,
        /// The user the context was resolved for.
        context: UserId,
    },
}

fn map_decode_error(e: &jsonwebtoken::errors::Error) -> JwtError {
    match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::MissingRequiredClaim(_) => JwtError::Invalid,
        _ => JwtError::DecodingError(e.to_string()),
    }
}

/// Verifies identity assertions issued by the identity provider.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    audience: Option<String>,
    validation: Validation,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .field("audience", &self.validation.aud)
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match &config.identity_audience {
            Some(aud) => {
                validation.set_audience(&[aud]);
                // jsonwebtoken skips the audience check when the claim is absent
                validation.set_required_spec_claims(&["exp", "aud"]);
            }
            None => validation.validate_aud = false,
        }

        Self {
            encoding_key: EncodingKey::from_secret(config.identity_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.identity_secret.as_bytes()),
            audience: config.identity_audience.clone(),
            validation,
        }
    }

    /// Validates an identity assertion and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::Invalid` if the signature or audience is wrong.
    /// Returns `JwtError::DecodingError` if the token is malformed.
    pub fn validate_identity(&self, token: &str) -> Result<IdentityClaims, JwtError> {
        decode::<IdentityClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| map_decode_error(&e))
    }

    /// Signs an identity assertion with the identity provider's secret.
    ///
    /// Stands in for the identity provider in local development and tests.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn issue_identity_token(
        &self,
        principal: &Principal,
        ttl: Duration,
    ) -> Result<String, JwtError> {
        let mut claims = IdentityClaims::new(principal, Utc::now() + ttl);
        claims.aud.clone_from(&self.audience);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }
}

/// Issues bridge tokens embedding a resolved tenant context.
///
/// Expiry is enforced by whoever consumes the token; the issuer only
/// guarantees the claims and the expiry timestamp.
#[derive(Clone)]
pub struct TokenBridge {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBridge")
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl TokenBridge {
    /// Creates a new bridge with the given configuration.
    #[must_use]
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.signing_secret.as_bytes()),
        }
    }

    /// Issues a bridge token valid for [`BRIDGE_TOKEN_TTL_HOURS`] from now.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::SubjectMismatch` if the context belongs to another user.
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn issue(
        &self,
        principal: &Principal,
        context: &ResolvedContext,
    ) -> Result<BridgeToken, JwtError> {
        self.issue_at(principal, context, Utc::now())
    }

    /// Issues a bridge token as of `issued_at`.
    ///
    /// # Errors
    ///
    /// Same as [`TokenBridge::issue`].
    pub fn issue_at(
        &self,
        principal: &Principal,
        context: &ResolvedContext,
        issued_at: DateTime<Utc>,
    ) -> Result<BridgeToken, JwtError> {
        if principal.id != context.user_id {
            return Err(JwtError::SubjectMismatch {
                principal: principal.id,
                context: context.user_id,
            });
        }

        let ttl = Duration::hours(BRIDGE_TOKEN_TTL_HOURS);
        let expires_at = issued_at + ttl;
        let claims = BridgeClaims::new(principal, context, issued_at, expires_at);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;

        Ok(BridgeToken {
            token,
            token_type: "bearer",
            expires_at,
            expires_in: ttl.num_seconds(),
        })
    }

    /// Verifies a bridge token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::Invalid` if the signature is wrong.
    pub fn decode(&self, token: &str) -> Result<BridgeClaims, JwtError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<BridgeClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| map_decode_error(&e))
    }
}

#[cfg(test)]
#[path = "jwt_tests.rs"]
mod tests;
