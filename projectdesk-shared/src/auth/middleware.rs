//! Bearer-token authentication for Axum
//!
//! [`authenticate`] validates `Authorization: Bearer <access token>` and
//! yields an [`AuthContext`]. A middleware stores it in the request
//! extensions and handlers take `AuthContext` as an extractor.
//!
//! # Example
//!
//! ```no_run
//! use axum::{extract::Request, middleware::{self, Next}, response::Response, routing::get, Router};
//! use projectdesk_shared::auth::middleware::{authenticate, AuthContext, AuthError};
//!
//! const SECRET: &str = "a-signing-secret-of-at-least-32-bytes!";
//!
//! async fn require_auth(mut req: Request, next: Next) -> Result<Response, AuthError> {
//!     let context = authenticate(req.headers(), SECRET)?;
//!     req.extensions_mut().insert(context);
//!     Ok(next.run(req).await)
//! }
//!
//! async fn me(auth: AuthContext) -> String {
//!     format!("Hello, user {}!", auth.user_id)
//! }
//!
//! let app: Router = Router::new()
//!     .route("/me", get(me))
//!     .route_layer(middleware::from_fn(require_auth));
//! ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};

/// The authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingCredentials,

    #[error("{0}")]
    InvalidFormat(String),

    #[error(transparent)]
    InvalidToken(#[from] JwtError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match self {
            AuthError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
        };

        let body = json!({
            "error": if status == StatusCode::BAD_REQUEST { "bad_request" } else { "unauthorized" },
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Extracts the bearer token from request headers.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not valid ASCII".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the bearer access token in `headers`.
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_access_token(token, secret)?;
    Ok(AuthContext::new(claims.sub))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}
