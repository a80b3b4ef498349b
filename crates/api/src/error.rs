//! Error rendering for the HTTP layer.
//!
//! Every failure leaves a handler as an [`ApiError`], is logged once at a
//! severity matching its class, and is rendered as
//! `{"error": {"code", "message", "details"?}}`.

use std::any::Any;

use axum::{
    Json,
    extract::{Request, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, RuntimeErr, sqlx};
use serde::Serialize;
use tracing::{error, info, warn};

use keystone_core::tenancy::ResolveError;
use keystone_db::rls::{RlsError, ScopedError};
use keystone_shared::{AppError, JwtError};

/// An [`AppError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self(AppError::Database(err.to_string()))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        Self(AppError::Internal(err.to_string()))
    }
}

/// SQLSTATE `insufficient_privilege`, raised for row-security violations.
const INSUFFICIENT_PRIVILEGE: &str = "42501";

fn sqlx_error(err: &DbErr) -> Option<&sqlx::Error> {
    match err {
        DbErr::Conn(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e)) => Some(e),
        _ => None,
    }
}

fn is_connection_failure(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        _ => sqlx_error(err).is_some_and(|e| {
            matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            )
        }),
    }
}

fn is_policy_rejection(err: &DbErr) -> bool {
    let code = sqlx_error(err)
        .and_then(sqlx::Error::as_database_error)
        .and_then(|db| db.code().map(|c| c.into_owned()));
    if let Some(code) = code {
        return code == INSUFFICIENT_PRIVILEGE;
    }
    match err {
        DbErr::Exec(_) | DbErr::Query(_) | DbErr::Custom(_) => {
            err.to_string().contains("violates row-level security policy")
        }
        _ => false,
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        if let DbErr::RecordNotFound(what) = err {
            return Self(AppError::NotFound(what));
        }
        if is_connection_failure(&err) {
            return Self(AppError::Database(err.to_string()));
        }
        if is_policy_rejection(&err) {
            warn!(error = %err, "Statement rejected by row-level security");
            return Self(AppError::Forbidden(
                "operation not permitted in this organization".to_string(),
            ));
        }
        Self(AppError::Internal(err.to_string()))
    }
}

impl From<RlsError> for ApiError {
    fn from(err: RlsError) -> Self {
        match err {
            RlsError::Context(_) => Self(AppError::RlsContext(err.to_string())),
            RlsError::Begin(_) | RlsError::Commit(_) => Self(AppError::Database(err.to_string())),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::BadRequest(rejection.body_text()))
    }
}

impl From<ScopedError<Self>> for ApiError {
    fn from(err: ScopedError<Self>) -> Self {
        match err {
            ScopedError::Rls(rls) => rls.into(),
            ScopedError::Operation(e) => e,
        }
    }
}

/// Body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    /// The error.
    pub error: ErrorBody,
}

/// Code, message and optional detail of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
    /// Server-side detail, development only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Full error information attached to error responses as an extension.
///
/// Only [`expose_error_details`] reads it.
#[derive(Debug, Clone)]
pub struct ErrorDetails {
    code: &'static str,
    message: String,
    detail: String,
}

fn log_error(err: &AppError) {
    let code = err.error_code();
    match err {
        AppError::Forbidden(_) => info!(code, detail = err.detail(), "Request forbidden"),
        AppError::Unauthorized(_) | AppError::BadRequest(_) | AppError::NotFound(_) => {
            warn!(code, detail = err.detail(), "Request rejected");
        }
        AppError::RlsContext(_) | AppError::Database(_) | AppError::Internal(_) => {
            error!(code, detail = err.detail(), "Request failed");
        }
    }
}

fn render(status: StatusCode, code: &'static str, message: String, details: Option<String>) -> Response {
    (
        status,
        Json(ErrorEnvelope {
            error: ErrorBody {
                code,
                message,
                details,
            },
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        log_error(&err);

        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = err.error_code();
        let message = err.public_message();

        let mut response = render(status, code, message.clone(), None);
        response.extensions_mut().insert(ErrorDetails {
            code,
            message,
            detail: err.detail().to_string(),
        });
        response
    }
}

/// Renders a caught handler panic as `INTERNAL_ERROR`.
#[allow(clippy::needless_pass_by_value)]
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "handler panicked".to_string()
    };

    ApiError(AppError::Internal(detail)).into_response()
}

/// Re-renders error responses with their `details` field filled in.
///
/// Mounted only when `server.environment` is `development`.
pub async fn expose_error_details(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let Some(details) = response.extensions().get::<ErrorDetails>().cloned() else {
        return response;
    };

    let extra = (details.detail != details.message).then_some(details.detail);
    let body = render(response.status(), details.code, details.message, extra).into_body();

    // Headers set upstream (CORS, Set-Cookie) stay; only the body changes.
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use tower::ServiceExt;
    use rstest::rstest;
    use sea_orm::ConnAcquireErr;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[rstest]
    #[case(AppError::Unauthorized("x".into()), 401, "UNAUTHORIZED")]
    #[case(AppError::Forbidden("x".into()), 403, "FORBIDDEN")]
    #[case(AppError::BadRequest("x".into()), 400, "BAD_REQUEST")]
    #[case(AppError::NotFound("x".into()), 404, "NOT_FOUND")]
    #[case(AppError::RlsContext("x".into()), 403, "RLS_CONTEXT_ERROR")]
    #[case(AppError::Database("x".into()), 503, "DATABASE_ERROR")]
    #[case(AppError::Internal("x".into()), 500, "INTERNAL_ERROR")]
    #[tokio::test]
    async fn test_envelope_status_and_code(
        #[case] err: AppError,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        let response = ApiError(err).into_response();

        assert_eq!(response.status().as_u16(), status);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], code);
        assert!(body["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn test_sensitive_detail_is_withheld() {
        let response =
            ApiError(AppError::Database("password authentication failed".into())).into_response();

        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Database temporarily unavailable");
        assert!(!body.to_string().contains("password"));
    }

    #[test]
    fn test_scoped_errors_classify() {
        let context: ApiError =
            ScopedError::<ApiError>::Rls(RlsError::Context(DbErr::Custom("x".into()))).into();
        assert!(matches!(context.0, AppError::RlsContext(_)));

        let begin: ApiError =
            ScopedError::<ApiError>::Rls(RlsError::Begin(DbErr::Custom("x".into()))).into();
        assert!(matches!(begin.0, AppError::Database(_)));

        let handler: ApiError =
            ScopedError::Operation(ApiError(AppError::NotFound("invoice".into()))).into();
        assert!(matches!(handler.0, AppError::NotFound(ref m) if m == "invoice"));
    }

    #[rstest]
    #[case(DbErr::RecordNotFound("invoice".into()), StatusCode::NOT_FOUND)]
    #[case(DbErr::ConnectionAcquire(ConnAcquireErr::Timeout), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(
        DbErr::Conn(RuntimeErr::Internal("connection reset by peer".into())),
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case(
        DbErr::Query(RuntimeErr::Internal(
            "new row violates row-level security policy for table \"workspaces\"".into()
        )),
        StatusCode::FORBIDDEN
    )]
    #[case(
        DbErr::Custom("new row violates row-level security policy for table \"users\"".into()),
        StatusCode::FORBIDDEN
    )]
    #[case(
        DbErr::Exec(RuntimeErr::Internal("division by zero".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    )]
    #[case(DbErr::Type("expected uuid".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_db_errors_classify(#[case] err: DbErr, #[case] status: StatusCode) {
        let err = ApiError::from(err);
        assert_eq!(err.0.status_code(), status.as_u16());
    }

    #[test]
    fn test_not_found_keeps_what_was_missing() {
        let err = ApiError::from(DbErr::RecordNotFound("invoice".into()));
        assert!(matches!(err.0, AppError::NotFound(ref m) if m == "invoice"));
    }

    #[test]
    fn test_policy_rejection_hides_table_name() {
        let err = ApiError::from(DbErr::Query(RuntimeErr::Internal(
            "new row violates row-level security policy for table \"workspaces\"".into(),
        )));
        assert!(matches!(err.0, AppError::Forbidden(_)));
        assert!(!err.0.public_message().contains("workspaces"));
    }

    #[tokio::test]
    async fn test_exposed_details_keep_response_headers() {
        async fn failing_with_cookie() -> Response {
            let mut response = ApiError(AppError::Internal("audit sink unreachable".into()))
                .into_response();
            response.headers_mut().insert(
                header::SET_COOKIE,
                header::HeaderValue::from_static("current_workspace_id=; Max-Age=0"),
            );
            response
        }

        let app = axum::Router::new()
            .route("/fail", axum::routing::get(failing_with_cookie))
            .layer(axum::middleware::from_fn(expose_error_details));
        let request = axum::http::Request::builder()
            .uri("/fail")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::SET_COOKIE).unwrap(),
            "current_workspace_id=; Max-Age=0"
        );
        let body = body_json(response).await;
        assert_eq!(body["error"]["details"], "audit sink unreachable");
    }

    #[test]
    fn test_panic_payloads() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = panic_response(Box::new(42_u8));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
