use super::*;
use crate::config::{AuthConfig, BridgeConfig};
use crate::types::{OrganizationId, Role, WorkspaceId};
use chrono::{Duration, Utc};

fn identity_service() -> JwtService {
    JwtService::new(&AuthConfig {
        identity_secret: "test-identity-secret".to_string(),
        ..AuthConfig::default()
    })
}

fn bridge() -> TokenBridge {
    TokenBridge::new(&BridgeConfig {
        signing_secret: "test-bridge-secret".to_string(),
    })
}

fn principal() -> Principal {
    Principal {
        id: UserId::new(),
        email: "ada@example.com".to_string(),
    }
}

fn context_for(principal: &Principal, role: Role) -> ResolvedContext {
    ResolvedContext {
        user_id: principal.id,
        organization_id: OrganizationId::new(),
        workspace_id: None,
        role,
        allowed_workspaces: vec![],
    }
}

#[test]
fn test_identity_token_roundtrip() {
    let service = identity_service();
    let principal = principal();

    let token = service
        .issue_identity_token(&principal, Duration::minutes(15))
        .unwrap();
    let claims = service.validate_identity(&token).unwrap();

    assert_eq!(claims.principal(), principal);
}

#[test]
fn test_identity_token_rejects_garbage() {
    let result = identity_service().validate_identity("invalid.token.here");
    assert!(result.is_err());
}

#[test]
fn test_identity_token_rejects_other_secret() {
    let other = JwtService::new(&AuthConfig {
        identity_secret: "someone-else".to_string(),
        ..AuthConfig::default()
    });
    let token = other
        .issue_identity_token(&principal(), Duration::minutes(15))
        .unwrap();

    assert!(matches!(
        identity_service().validate_identity(&token),
        Err(JwtError::Invalid)
    ));
}

#[test]
fn test_identity_token_expired() {
    let service = identity_service();
    let token = service
        .issue_identity_token(&principal(), Duration::hours(-2))
        .unwrap();

    assert!(matches!(
        service.validate_identity(&token),
        Err(JwtError::Expired)
    ));
}

#[test]
fn test_identity_audience_is_checked_when_configured() {
    let issuer = identity_service();
    let strict = JwtService::new(&AuthConfig {
        identity_secret: "test-identity-secret".to_string(),
        identity_audience: Some("authenticated".to_string()),
        ..AuthConfig::default()
    });
    let token = issuer
        .issue_identity_token(&principal(), Duration::minutes(5))
        .unwrap();

    // No aud claim at all, so a configured audience cannot match.
    assert!(matches!(
        strict.validate_identity(&token),
        Err(JwtError::Invalid)
    ));
}

#[test]
fn test_identity_audience_must_match_when_configured() {
    let service_for = |aud: &str| {
        JwtService::new(&AuthConfig {
            identity_secret: "test-identity-secret".to_string(),
            identity_audience: Some(aud.to_string()),
            ..AuthConfig::default()
        })
    };
    let strict = service_for("authenticated");
    let principal = principal();

    let good = strict
        .issue_identity_token(&principal, Duration::minutes(5))
        .unwrap();
    let claims = strict.validate_identity(&good).unwrap();
    assert_eq!(claims.sub, principal.id);
    assert_eq!(claims.aud.as_deref(), Some("authenticated"));

    let foreign = service_for("anon")
        .issue_identity_token(&principal, Duration::minutes(5))
        .unwrap();
    assert!(matches!(
        strict.validate_identity(&foreign),
        Err(JwtError::Invalid)
    ));
}

#[test]
fn test_bridge_token_claims_match_context() {
    let bridge = bridge();
    let principal = principal();
    let mut context = context_for(&principal, Role::Admin);
    context.allowed_workspaces = vec![WorkspaceId::new(), WorkspaceId::new()];

    let issued = bridge.issue(&principal, &context).unwrap();
    let claims = bridge.decode(&issued.token).unwrap();

    assert_eq!(claims.sub, principal.id);
    assert_eq!(claims.email, "ada@example.com");
    assert_eq!(claims.org_id, context.organization_id);
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.allowed_workspaces, context.allowed_workspaces);
    assert_eq!(
        claims.permissions,
        Role::Admin
            .permissions()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_bridge_token_expires_after_24_hours() {
    let bridge = bridge();
    let principal = principal();
    let context = context_for(&principal, Role::Admin);

    let before = Utc::now().timestamp();
    let issued = bridge.issue(&principal, &context).unwrap();
    let claims = bridge.decode(&issued.token).unwrap();
    let after = Utc::now().timestamp();

    assert!(claims.iat >= before && claims.iat <= after);
    assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    assert_eq!(issued.expires_in, 24 * 60 * 60);
    assert_eq!(issued.expires_at.timestamp(), claims.exp);
}

#[test]
fn test_bridge_token_is_compact_jws() {
    let bridge = bridge();
    let principal = principal();
    let issued = bridge
        .issue(&principal, &context_for(&principal, Role::Viewer))
        .unwrap();

    let segments: Vec<&str> = issued.token.split('.').collect();
    assert_eq!(segments.len(), 3);
    assert!(segments.iter().all(|s| !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')));
    assert_eq!(issued.token_type, "bearer");
}

#[test]
fn test_bridge_refuses_foreign_context() {
    let bridge = bridge();
    let principal = principal();
    let someone_else = context_for(
        &Principal {
            id: UserId::new(),
            email: "eve@example.com".to_string(),
        },
        Role::Owner,
    );

    assert!(matches!(
        bridge.issue(&principal, &someone_else),
        Err(JwtError::SubjectMismatch { .. })
    ));
}

#[test]
fn test_bridge_decode_rejects_expired_token() {
    let bridge = bridge();
    let principal = principal();
    let context = context_for(&principal, Role::Viewer);

    let issued = bridge
        .issue_at(&principal, &context, Utc::now() - Duration::hours(25))
        .unwrap();

    assert!(matches!(bridge.decode(&issued.token), Err(JwtError::Expired)));
}

#[test]
fn test_bridge_and_identity_keys_are_independent() {
    let bridge = bridge();
    let principal = principal();
    let issued = bridge
        .issue(&principal, &context_for(&principal, Role::Owner))
        .unwrap();

    assert!(identity_service().validate_identity(&issued.token).is_err());
}
