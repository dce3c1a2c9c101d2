/// The authenticated user
///
/// # Endpoints
///
/// - `GET /v1/me` - Current user
/// - `DELETE /v1/me` - Delete the account with its boards, lists and tasks

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, http::StatusCode, Json};
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::models::user::User;

/// Returns the caller's account
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
pub async fn get_me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<User>> {
    let user = state.repos.users.find(auth.user_id).await?;
    Ok(Json(user))
}

/// Deletes the caller's account
///
/// Answers `204 No Content`. Everything the user owns goes with it. A
/// later request with a still-valid token provisions a fresh, empty account.
pub async fn delete_me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<StatusCode> {
    state.repos.users.delete(auth.user_id).await?;
    tracing::info!(user_id = %auth.user_id, "Account deleted");

    Ok(StatusCode::NO_CONTENT)
}
