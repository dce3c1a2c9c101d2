/// List endpoints
///
/// Lists keep dense positions `1..=N` on their board. Clients see the
/// 0-based `index` as well and send indexes, not positions, when moving.
///
/// # Endpoints
///
/// - `POST /v1/boards/:id/lists` - Append a list to a board
/// - `GET /v1/lists/:id` - Get a list
/// - `PATCH /v1/lists/:id` - Rename or recolor
/// - `DELETE /v1/lists/:id` - Delete with its tasks
/// - `PATCH /v1/lists/:id/move` - Move to a new index

use super::{deserialize_some, owned_board, owned_list, ListResponse, OptionalJson};
use crate::{app::AppState, error::ApiResult, retry::retry_once};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::error::CoreResult;
use taskboard_shared::models::list::{ListColor, NewList, UpdateList};
use taskboard_shared::ordering::Position;
use uuid::Uuid;
use validator::Validate;

/// Create list request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateListRequest {
    /// Omitted or blank picks a unique "New List"
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    /// One of gray, red, orange, yellow, green, blue, purple, pink
    pub color: Option<String>,
}

impl CreateListRequest {
    fn into_new_list(self) -> CoreResult<NewList> {
        Ok(NewList {
            name: self.name,
            color: parse_color(self.color.as_deref())?,
        })
    }
}

/// Update list request
///
/// `"color": null` clears the color; an absent field is left alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateListRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub color: Option<Option<String>>,
}

impl UpdateListRequest {
    fn into_update(self) -> CoreResult<UpdateList> {
        let color = match self.color {
            Some(color) => Some(parse_color(color.as_deref())?),
            None => None,
        };
        Ok(UpdateList {
            name: self.name,
            color,
        })
    }
}

/// Move list request
#[derive(Debug, Deserialize)]
pub struct MoveListRequest {
    /// 0-based target index; out-of-range values are clamped
    pub index: i64,
}

impl MoveListRequest {
    /// Target position, clamping negatives to the front
    pub fn target(&self) -> Position {
        let index = usize::try_from(self.index.max(0)).unwrap_or(usize::MAX);
        Position::from_ui_index(index)
    }
}

fn parse_color(color: Option<&str>) -> CoreResult<Option<ListColor>> {
    color.map(str::parse).transpose()
}

/// Appends a list to a board
///
/// # Endpoint
///
/// ```text
/// POST /v1/boards/:id/lists
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "name": "Doing", "color": "blue" }
/// ```
///
/// The new list goes after the board's last one.
///
/// # Errors
///
/// - `404 Not Found`: No such board for this caller
/// - `409 Conflict`: Lost a race with another writer twice
/// - `422 Unprocessable Entity`: Over-long name or unknown color
pub async fn create_list(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(board_id): Path<Uuid>,
    OptionalJson(req): OptionalJson<CreateListRequest>,
) -> ApiResult<(StatusCode, Json<ListResponse>)> {
    req.validate()?;
    let new_list = req.into_new_list()?;

    let board = owned_board(&state, &auth, board_id).await?;
    let list = retry_once("create_list", || state.repos.lists.insert(board.id, new_list.clone())).await?;

    Ok((StatusCode::CREATED, Json(list.into())))
}

/// Gets a list
pub async fn get_list(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ListResponse>> {
    let list = owned_list(&state, &auth, id).await?;
    Ok(Json(list.into()))
}

/// Renames or recolors a list; its position does not change
///
/// # Errors
///
/// - `404 Not Found`: No such list for this caller
/// - `422 Unprocessable Entity`: Blank or over-long name, unknown color
pub async fn update_list(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateListRequest>, JsonRejection>,
) -> ApiResult<Json<ListResponse>> {
    let Json(req) = payload?;
    req.validate()?;
    let update = req.into_update()?;

    let list = owned_list(&state, &auth, id).await?;
    let list = state.repos.lists.update(list.id, update).await?;

    Ok(Json(list.into()))
}

/// Deletes a list with its tasks
///
/// Lists after it move up by one.
pub async fn delete_list(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let list = owned_list(&state, &auth, id).await?;
    retry_once("delete_list", || state.repos.lists.remove(list.id)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Moves a list to a new index
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/lists/:id/move
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "index": 0 }
/// ```
///
/// The index is 0-based and clamped to the board: a negative index moves to
/// the front, one past the end moves to the back.
///
/// # Response
///
/// The board's lists in their new order.
pub async fn move_list(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<MoveListRequest>, JsonRejection>,
) -> ApiResult<Json<Vec<ListResponse>>> {
    let Json(req) = payload?;
    let target = req.target();

    let list = owned_list(&state, &auth, id).await?;
    let moved = retry_once("move_list", || {
        state.repos.lists.move_to(list.id, list.board_id, target)
    })
    .await?;
    tracing::debug!(list_id = %moved.id, position = moved.position, "List moved");

    let lists = state.repos.lists.lists_of(list.board_id).await?;
    Ok(Json(lists.into_iter().map(ListResponse::from).collect()))
}
