/// Bearer-token authentication for Axum
///
/// [`authenticate`] validates the `Authorization: Bearer <token>` header
/// and yields the identity the token carries. A middleware resolves that
/// identity to a user, stores the resulting [`AuthContext`] in the request
/// extensions, and handlers take `AuthContext` as an extractor.
///
/// # Example
///
/// ```no_run
/// use axum::{extract::Request, middleware::{self, Next}, response::Response, routing::get, Router};
/// use taskboard_shared::auth::middleware::{authenticate, AuthContext, AuthError};
/// use uuid::Uuid;
///
/// # fn user_id_for(_external_auth_id: &str) -> Uuid { Uuid::nil() }
/// async fn require_token(mut req: Request, next: Next) -> Result<Response, AuthError> {
///     let identity = authenticate(req.headers(), "secret")?;
///     let user_id = user_id_for(&identity.external_auth_id);
///     req.extensions_mut().insert(AuthContext::new(user_id));
///     Ok(next.run(req).await)
/// }
///
/// async fn whoami(auth: AuthContext) -> String {
///     format!("Hello, user {}!", auth.user_id)
/// }
///
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(require_token));
/// ```

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};
use crate::models::user::ExternalIdentity;

/// Identity of the caller, added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Why a request could not be authenticated
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Missing authorization header")]
    MissingCredentials,

    /// Header is not a Bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("{0}")]
    InvalidToken(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates the bearer token in `headers` and returns its identity
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<ExternalIdentity, AuthError> {
    let token = bearer_token(headers)?;
    let claims = validate_token(token, secret)?;
    Ok(claims.identity())
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
