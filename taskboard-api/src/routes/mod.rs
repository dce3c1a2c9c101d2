/// API route handlers
///
/// - `health`: Health check endpoint
/// - `me`: The authenticated user
/// - `boards`: Boards and board-wide task projections
/// - `lists`: List CRUD and reordering
/// - `tasks`: Task CRUD and lifecycle transitions
///
/// Every resource is scoped to the caller: a board, list or task owned by
/// someone else is reported as not found.

pub mod boards;
pub mod health;
pub mod lists;
pub mod me;
pub mod tasks;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::error::CoreError;
use taskboard_shared::models::{board::Board, list::List, task::Task};
use taskboard_shared::ordering::Position;
use uuid::Uuid;

/// Task as returned to clients, with the derived completion flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,

    pub completed: bool,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            completed: task.is_completed(),
            task,
        }
    }
}

/// List as returned to clients, with its 0-based drop index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(flatten)]
    pub list: List,

    pub index: usize,
}

impl From<List> for ListResponse {
    fn from(list: List) -> Self {
        Self {
            index: Position::new(list.position).to_ui_index(),
            list,
        }
    }
}

/// Pending and completed tasks of one scope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskBuckets {
    pub pending: Vec<TaskResponse>,
    pub completed: Vec<TaskResponse>,
}

impl TaskBuckets {
    pub fn new(pending: Vec<Task>, completed: Vec<Task>) -> Self {
        Self {
            pending: pending.into_iter().map(TaskResponse::from).collect(),
            completed: completed.into_iter().map(TaskResponse::from).collect(),
        }
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Used with `#[serde(default, deserialize_with = "deserialize_some")]` on
/// `Option<Option<T>>` fields: absent is `None`, `null` is `Some(None)`.
pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// JSON body that may be left out
///
/// An empty body yields `T::default()`. A non-empty body must be JSON with
/// a JSON content type and must match `T`, otherwise the request is a 400.
#[derive(Debug)]
pub struct OptionalJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalJson<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let headers = req.headers().clone();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(JsonRejection::from)?;
        if bytes.is_empty() {
            return Ok(Self(T::default()));
        }

        let mut req = Request::new(Body::from(bytes));
        *req.headers_mut() = headers;
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Loads a board the caller owns
pub(crate) async fn owned_board(state: &AppState, auth: &AuthContext, board_id: Uuid) -> ApiResult<Board> {
    let board = state.repos.boards.find(board_id).await?;
    if board.owner_id != auth.user_id {
        return Err(CoreError::not_found("board", board_id).into());
    }
    Ok(board)
}

/// Loads a list on one of the caller's boards
pub(crate) async fn owned_list(state: &AppState, auth: &AuthContext, list_id: Uuid) -> ApiResult<List> {
    let list = state.repos.lists.find(list_id).await?;
    owned_board(state, auth, list.board_id)
        .await
        .map_err(|_| CoreError::not_found("list", list_id))?;
    Ok(list)
}

/// Loads a task in one of the caller's lists
pub(crate) async fn owned_task(state: &AppState, auth: &AuthContext, task_id: Uuid) -> ApiResult<Task> {
    let task = state.repos.tasks.find(task_id).await?;
    owned_list(state, auth, task.list_id)
        .await
        .map_err(|_| CoreError::not_found("task", task_id))?;
    Ok(task)
}
