/// Task endpoints
///
/// # Endpoints
///
/// - `GET /v1/lists/:id/tasks` - A list's tasks, split into pending and completed
/// - `POST /v1/lists/:id/tasks` - Create a task
/// - `GET /v1/tasks/:id` - Get a task
/// - `PATCH /v1/tasks/:id` - Partial update
/// - `DELETE /v1/tasks/:id` - Delete a task
/// - `PATCH /v1/tasks/:id/complete` - Toggle completion
/// - `PATCH /v1/tasks/:id/snooze` - Push the due date back

use super::{deserialize_some, owned_list, owned_task, OptionalJson, TaskBuckets, TaskResponse};
use crate::{app::AppState, error::ApiResult, retry::retry_once};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use taskboard_shared::auth::middleware::AuthContext;
use taskboard_shared::lifecycle::DEFAULT_SNOOZE_DAYS;
use taskboard_shared::models::task::{NewTask, Priority, TaskScope, UpdateTask};
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Omitted or blank becomes "New Task"
    #[validate(length(max = 255, message = "Title must be at most 255 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 10000, message = "Description must be at most 10000 characters"))]
    pub description: Option<String>,

    /// unset, low, medium or high
    #[serde(default)]
    pub priority: Priority,

    pub due_date: Option<NaiveDate>,

    pub due_time: Option<NaiveTime>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        NewTask {
            title: req.title,
            description: req.description,
            priority: req.priority,
            due_date: req.due_date,
            due_time: req.due_time,
        }
    }
}

/// Update task request
///
/// Absent fields are left alone; `null` clears a nullable field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,

    pub priority: Option<Priority>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_date: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub due_time: Option<Option<NaiveTime>>,

    pub completed: Option<bool>,
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            description: req.description,
            priority: req.priority,
            due_date: req.due_date,
            due_time: req.due_time,
            completed: req.completed,
        }
    }
}

/// Snooze request; the body may be omitted
#[derive(Debug, Default, Deserialize, Validate)]
pub struct SnoozeRequest {
    /// Days to defer by (default 1)
    #[validate(range(min = 1, max = 3650, message = "Days must be between 1 and 3650"))]
    pub days: Option<u64>,
}

/// A list's tasks
///
/// # Response
///
/// ```json
/// {
///   "pending": [ { "id": "uuid", "title": "Buy milk", "completed": false, ... } ],
///   "completed": [ { "id": "uuid", "title": "Buy eggs", "completed": true, ... } ]
/// }
/// ```
///
/// Pending tasks are oldest first; completed tasks are most recently
/// completed first.
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(list_id): Path<Uuid>,
) -> ApiResult<Json<TaskBuckets>> {
    let list = owned_list(&state, &auth, list_id).await?;
    let pending = state.repos.tasks.pending(TaskScope::List(list.id)).await?;
    let completed = state.repos.tasks.completed(TaskScope::List(list.id)).await?;

    Ok(Json(TaskBuckets::new(pending, completed)))
}

/// Creates a pending task
///
/// # Endpoint
///
/// ```text
/// POST /v1/lists/:id/tasks
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "title": "Buy milk", "priority": "high", "due_date": "2024-05-01" }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: No such list for this caller
/// - `422 Unprocessable Entity`: Over-long title or description
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(list_id): Path<Uuid>,
    OptionalJson(req): OptionalJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    req.validate()?;

    let list = owned_list(&state, &auth, list_id).await?;
    let task = state.repos.tasks.create(list.id, req.into()).await?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

/// Gets a task
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = owned_task(&state, &auth, id).await?;
    Ok(Json(task.into()))
}

/// Updates any subset of a task's fields
///
/// `"completed": true` on an already completed task keeps its original
/// completion time.
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskResponse>> {
    let Json(req) = payload?;
    req.validate()?;

    let task = owned_task(&state, &auth, id).await?;
    let task = state.repos.tasks.update(task.id, req.into()).await?;

    Ok(Json(task.into()))
}

/// Deletes a task
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let task = owned_task(&state, &auth, id).await?;
    state.repos.tasks.delete(task.id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Toggles completion
///
/// A pending task becomes completed now; a completed one becomes pending.
pub async fn toggle_complete(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = owned_task(&state, &auth, id).await?;
    let task = retry_once("toggle_complete", || state.repos.tasks.toggle_complete(task.id)).await?;

    Ok(Json(task.into()))
}

/// Pushes the due date back
///
/// # Endpoint
///
/// ```text
/// PATCH /v1/tasks/:id/snooze
/// Authorization: Bearer <jwt_token>
/// Content-Type: application/json
///
/// { "days": 3 }
/// ```
///
/// Without a body the task is deferred by one day. A task without a due
/// date is returned unchanged.
pub async fn snooze_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    OptionalJson(req): OptionalJson<SnoozeRequest>,
) -> ApiResult<Json<TaskResponse>> {
    req.validate()?;
    let days = req.days.unwrap_or(DEFAULT_SNOOZE_DAYS);

    let task = owned_task(&state, &auth, id).await?;
    let task = retry_once("snooze_task", || state.repos.tasks.snooze(task.id, days)).await?;

    Ok(Json(task.into()))
}
