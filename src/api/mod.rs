//! HTTP surface.

mod members;
mod periods;
mod shop;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use crate::domain::aggregates::{MemberId, Role};
use crate::service::NetworkService;
use crate::NetworkError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

#[derive(Clone)]
pub struct AppState { pub service: Arc<NetworkService> }

pub fn router(service: Arc<NetworkService>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-network"})) }))
        .merge(periods::routes())
        .merge(members::routes())
        .merge(shop::routes())
        .with_state(AppState { service })
}

/// Wrapper that turns a [`NetworkError`] into a JSON error response.
pub struct ApiError(pub NetworkError);

impl From<NetworkError> for ApiError {
    fn from(e: NetworkError) -> Self { ApiError(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            NetworkError::Validation(_) => StatusCode::BAD_REQUEST,
            NetworkError::Forbidden(_) => StatusCode::FORBIDDEN,
            NetworkError::NotFound(_) => StatusCode::NOT_FOUND,
            NetworkError::Conflict(_) | NetworkError::AlreadyClosed(_) => StatusCode::CONFLICT,
            NetworkError::DataIntegrity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            NetworkError::StorageError(e) => {
                tracing::error!(error = %e, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Caller identity, taken from headers set by the upstream gateway.
#[derive(Clone, Copy, Debug)]
pub struct Actor {
    pub id: MemberId,
    pub role: Role,
}

impl Actor {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin { return Ok(()); }
        tracing::warn!(actor = %self.id, role = %self.role, "admin action refused");
        Err(ApiError(NetworkError::Forbidden("admin role required".into())))
    }

    /// Staff and admins see everyone; other roles only themselves.
    pub fn require_self_or_staff(&self, member: MemberId) -> Result<(), ApiError> {
        if matches!(self.role, Role::Admin | Role::Staff) || self.id == member { return Ok(()); }
        Err(ApiError(NetworkError::Forbidden(format!("cannot read member {}", member))))
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
        let id = header(ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError(NetworkError::Forbidden(format!("missing {} header", ACTOR_ID_HEADER))))?
            .parse::<MemberId>()
            .map_err(|_| ApiError(NetworkError::Forbidden(format!("malformed {} header", ACTOR_ID_HEADER))))?;
        let role = header(ACTOR_ROLE_HEADER)
            .ok_or_else(|| ApiError(NetworkError::Forbidden(format!("missing {} header", ACTOR_ROLE_HEADER))))?
            .parse::<Role>()
            .map_err(|e| ApiError(NetworkError::Forbidden(e.to_string())))?;
        Ok(Actor { id, role })
    }
}
