/// Board endpoints
///
/// # Endpoints
///
/// - `GET /v1/boards` - Caller's boards, oldest first
/// - `POST /v1/boards` - Create a board
/// - `GET /v1/boards/:id` - Board with its lists and their tasks
/// - `PATCH /v1/boards/:id` - Rename a board
/// - `DELETE /v1/boards/:id` - Delete a board with its lists and tasks
/// - `GET /v1/boards/:id/tasks/pending` - Pending tasks across the board
/// - `GET /v1/boards/:id/tasks/completed` - Completed tasks across the board

use super::{owned_board, ListResponse, OptionalJson, TaskBuckets, TaskResponse};
use crate::{app::AppState, error::ApiResult, retry::retry_once};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::models::board::{Board, NewBoard};
use taskboard_shared::models::task::{Task, TaskScope};
use taskboard_shared::repository::BoardSnapshot;
use uuid::Uuid;
use validator::Validate;

/// Create board request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateBoardRequest {
    /// Board name; omitted or blank picks a unique "New Board"
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,
}

/// Rename board request
#[derive(Debug, Deserialize, Validate)]
pub struct RenameBoardRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
}

/// List boards response
#[derive(Debug, Serialize, Deserialize)]
pub struct ListBoardsResponse {
    pub boards: Vec<Board>,
}

/// A list with its tasks split by completion
#[derive(Debug, Serialize, Deserialize)]
pub struct ListWithTasks {
    #[serde(flatten)]
    pub list: ListResponse,

    #[serde(flatten)]
    pub tasks: TaskBuckets,
}

/// Board with every list in position order
#[derive(Debug, Serialize, Deserialize)]
pub struct BoardDetail {
    #[serde(flatten)]
    pub board: Board,

    pub lists: Vec<ListWithTasks>,
}

/// Tasks of one projection
#[derive(Debug, Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<TaskResponse>,
}

impl From<Vec<Task>> for TasksResponse {
    fn from(tasks: Vec<Task>) -> Self {
        Self {
            tasks: tasks.into_iter().map(TaskResponse::from).collect(),
        }
    }
}

/// Lists the caller's boards
///
/// # Endpoint
///
/// ```text
/// GET /v1/boards
/// Authorization: Bearer <jwt_token>
/// ```
pub async fn list_boards(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<ListBoardsResponse>> {
    let boards = state.repos.boards.boards_of(auth.user_id).await?;
    Ok(Json(ListBoardsResponse { boards }))
}

/// Creates a board
///
/// # Endpoint
///
/// ```text
/// POST /v1/boards
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "name": "Groceries" }
/// ```
///
/// The body is optional; without a name the board is called "New Board",
/// or "New Board 2" and so on if the caller already has one.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
/// - `404 Not Found`: The account no longer exists
/// - `422 Unprocessable Entity`: Name too long
pub async fn create_board(
    State(state): State<AppState>,
    auth: AuthContext,
    OptionalJson(req): OptionalJson<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    req.validate()?;

    let board = retry_once("create_board", || {
        state.repos.boards.create(
            auth.user_id,
            NewBoard {
                name: req.name.clone(),
            },
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(board)))
}

/// Board with its lists and their tasks
///
/// # Response
///
/// ```json
/// {
///   "id": "uuid",
///   "name": "Groceries",
///   "lists": [
///     { "id": "uuid", "name": "To buy", "position": 1, "index": 0,
///       "pending": [...], "completed": [...] }
///   ]
/// }
/// ```
///
/// Lists and tasks come from one snapshot, so a concurrent move or toggle
/// never shows up half applied.
pub async fn get_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BoardDetail>> {
    let board = owned_board(&state, &auth, id).await?;
    let BoardSnapshot {
        board,
        lists,
        pending,
        completed,
    } = state.repos.boards.snapshot(board.id).await?;

    let mut pending = group_by_list(pending);
    let mut completed = group_by_list(completed);

    let lists = lists
        .into_iter()
        .map(|list| {
            let tasks = TaskBuckets::new(
                pending.remove(&list.id).unwrap_or_default(),
                completed.remove(&list.id).unwrap_or_default(),
            );
            ListWithTasks {
                list: ListResponse::from(list),
                tasks,
            }
        })
        .collect();

    Ok(Json(BoardDetail { board, lists }))
}

/// Splits an ordered projection per list, keeping the order within each
fn group_by_list(tasks: Vec<Task>) -> HashMap<Uuid, Vec<Task>> {
    let mut grouped: HashMap<Uuid, Vec<Task>> = HashMap::new();
    for task in tasks {
        grouped.entry(task.list_id).or_default().push(task);
    }
    grouped
}

/// Renames a board
///
/// # Errors
///
/// - `404 Not Found`: No such board for this caller
/// - `422 Unprocessable Entity`: Blank or over-long name
pub async fn rename_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<RenameBoardRequest>, JsonRejection>,
) -> ApiResult<Json<Board>> {
    let Json(req) = payload?;
    req.validate()?;

    let board = owned_board(&state, &auth, id).await?;
    let board = state.repos.boards.rename(board.id, &req.name).await?;

    Ok(Json(board))
}

/// Deletes a board with its lists and tasks
pub async fn delete_board(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let board = owned_board(&state, &auth, id).await?;
    state.repos.boards.delete(board.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Pending tasks across the board, oldest first
pub async fn pending_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TasksResponse>> {
    let board = owned_board(&state, &auth, id).await?;
    let tasks = state.repos.tasks.pending(TaskScope::Board(board.id)).await?;

    Ok(Json(tasks.into()))
}

/// Completed tasks across the board, most recently completed first
pub async fn completed_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TasksResponse>> {
    let board = owned_board(&state, &auth, id).await?;
    let tasks = state.repos.tasks.completed(TaskScope::Board(board.id)).await?;

    Ok(Json(tasks.into()))
}
