//! Router test harness: in-memory membership store, mock database and
//! requests signed by a stand-in identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    middleware::from_fn_with_state,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use sea_orm::{DatabaseConnection, DbBackend, MockDatabase};
use serde_json::Value;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;

use crate::{
    AppState, create_router,
    error::{expose_error_details, panic_response},
    middleware::{auth_middleware, tenant_middleware},
};
use keystone_core::tenancy::{Membership, MembershipStore, SessionResolver, StoreError};
use keystone_shared::{
    AuthConfig, BridgeConfig, JwtService, OrganizationId, Principal, Role, SessionConfig,
    TokenBridge, UserId, WorkspaceId,
};

const IDENTITY_SECRET: &str = "test-identity-secret";
const BRIDGE_SECRET: &str = "test-bridge-secret";

/// An active membership joined `days_ago` days ago in a fresh organization.
pub(crate) fn membership(user_id: UserId, role: Role, days_ago: i64) -> Membership {
    Membership {
        user_id,
        organization_id: OrganizationId::new(),
        role,
        is_active: true,
        allowed_workspaces: vec![],
        joined_at: Utc::now() - Duration::days(days_ago),
    }
}

/// In-memory [`MembershipStore`].
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeStore {
    memberships: Vec<Membership>,
    workspaces: Vec<(OrganizationId, WorkspaceId)>,
    unavailable: bool,
}

impl FakeStore {
    pub(crate) fn with_memberships(memberships: Vec<Membership>) -> Self {
        Self {
            memberships,
            ..Self::default()
        }
    }

    pub(crate) fn with_workspace(mut self, org: OrganizationId, ws: WorkspaceId) -> Self {
        self.workspaces.push((org, ws));
        self
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MembershipStore for FakeStore {
    async fn active_memberships(&self, user_id: UserId) -> Result<Vec<Membership>, StoreError> {
        if self.unavailable {
            return Err(StoreError("connection refused".to_string()));
        }
        Ok(self
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active)
            .cloned()
            .collect())
    }

    async fn workspace_in_organization(
        &self,
        _user_id: UserId,
        organization_id: OrganizationId,
        workspace_id: WorkspaceId,
    ) -> Result<bool, StoreError> {
        if self.unavailable {
            return Err(StoreError("connection refused".to_string()));
        }
        Ok(self.workspaces.contains(&(organization_id, workspace_id)))
    }
}

/// A fully wired router plus its state.
pub(crate) struct TestApp {
    pub(crate) state: AppState,
    router: Router,
}

impl TestApp {
    /// Router over `memberships` with an empty mock database.
    pub(crate) fn new(memberships: Vec<Membership>) -> Self {
        Self::build(
            FakeStore::with_memberships(memberships),
            MockDatabase::new(DbBackend::Postgres).into_connection(),
            None,
            false,
        )
    }

    /// Router over `store` and `db`. `extra` routes are mounted at the root
    /// behind the same authentication and tenant middleware.
    pub(crate) fn build(
        store: FakeStore,
        db: DatabaseConnection,
        extra: Option<Router<AppState>>,
        expose_error_details_enabled: bool,
    ) -> Self {
        let auth = AuthConfig {
            identity_secret: IDENTITY_SECRET.to_string(),
            ..AuthConfig::default()
        };
        let bridge = BridgeConfig {
            signing_secret: BRIDGE_SECRET.to_string(),
        };

        let state = AppState {
            db: Arc::new(db),
            resolver: Arc::new(SessionResolver::new(Arc::new(store))),
            jwt_service: Arc::new(JwtService::new(&auth)),
            token_bridge: Arc::new(TokenBridge::new(&bridge)),
            auth: Arc::new(auth),
            session: Arc::new(SessionConfig::default()),
            expose_error_details: expose_error_details_enabled,
        };

        let mut router = create_router(state.clone());
        if let Some(extra) = extra {
            let mut extra = extra
                .layer(from_fn_with_state(state.clone(), tenant_middleware))
                .layer(from_fn_with_state(state.clone(), auth_middleware))
                .layer(CatchPanicLayer::custom(panic_response))
                .with_state(state.clone());
            if expose_error_details_enabled {
                extra = extra.layer(axum::middleware::from_fn(expose_error_details));
            }
            router = router.merge(extra);
        }

        Self { state, router }
    }

    /// A request authenticated as `user_id` through the bearer header.
    pub(crate) fn request(&self, method: Method, uri: &str, user_id: UserId) -> TestRequest<'_> {
        let token = self.identity_token(user_id);
        self.anonymous(method, uri)
            .header(header::AUTHORIZATION.as_str(), &format!("Bearer {token}"))
    }

    /// A request without credentials.
    pub(crate) fn anonymous(&self, method: Method, uri: &str) -> TestRequest<'_> {
        TestRequest {
            router: &self.router,
            builder: Request::builder().method(method).uri(uri),
            body: Body::empty(),
        }
    }

    /// Signs an identity assertion the way the identity provider would.
    pub(crate) fn identity_token(&self, user_id: UserId) -> String {
        let principal = Principal {
            id: user_id,
            email: format!("{user_id}@example.com"),
        };
        self.state
            .jwt_service
            .issue_identity_token(&principal, Duration::minutes(5))
            .expect("should sign identity token")
    }
}

/// A request under construction.
pub(crate) struct TestRequest<'a> {
    router: &'a Router,
    builder: axum::http::request::Builder,
    body: Body,
}

impl TestRequest<'_> {
    pub(crate) fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub(crate) fn cookie(self, cookie: &str) -> Self {
        self.header(header::COOKIE.as_str(), cookie)
    }

    pub(crate) fn json(mut self, body: &Value) -> Self {
        self.builder = self
            .builder
            .header(header::CONTENT_TYPE, "application/json");
        self.body = Body::from(body.to_string());
        self
    }

    pub(crate) fn raw_json(mut self, body: &'static str) -> Self {
        self.builder = self
            .builder
            .header(header::CONTENT_TYPE, "application/json");
        self.body = Body::from(body);
        self
    }

    /// Sends the request; returns the status, `Set-Cookie` values and JSON body.
    pub(crate) async fn send_full(self) -> (StatusCode, Vec<String>, Value) {
        let request = self.builder.body(self.body).expect("valid request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("readable body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("JSON body")
        };

        (status, cookies, body)
    }

    /// Sends the request; returns the status and JSON body.
    pub(crate) async fn send(self) -> (StatusCode, Value) {
        let (status, _, body) = self.send_full().await;
        (status, body)
    }
}
