/// Task model and database operations
///
/// Tasks belong to a list and are never reordered by hand; their display
/// order comes from the lifecycle projections in [`crate::lifecycle`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY,
///     list_id UUID NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL CHECK (btrim(title) <> ''),
///     description TEXT,
///     priority SMALLINT CHECK (priority BETWEEN 0 AND 2),
///     due_date DATE,
///     due_time TIME,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::naming;

/// Task priority
///
/// Stored as a nullable SMALLINT: `Unset` is NULL, the rest are 0..=2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Unset,
    Low,
    Medium,
    High,
}

impl Priority {
    /// Storage representation
    pub fn to_db(self) -> Option<i16> {
        match self {
            Priority::Unset => None,
            Priority::Low => Some(0),
            Priority::Medium => Some(1),
            Priority::High => Some(2),
        }
    }

    /// Decodes the storage representation
    pub fn from_db(value: Option<i16>) -> CoreResult<Self> {
        match value {
            None => Ok(Priority::Unset),
            Some(0) => Ok(Priority::Low),
            Some(1) => Ok(Priority::Medium),
            Some(2) => Ok(Priority::High),
            Some(other) => Err(CoreError::Storage(format!("invalid priority value: {}", other))),
        }
    }
}

/// Unit of work inside a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Parent list
    pub list_id: Uuid,

    /// Title, never blank
    pub title: String,

    /// Free-form notes
    pub description: Option<String>,

    pub priority: Priority,

    pub due_date: Option<NaiveDate>,

    pub due_time: Option<NaiveTime>,

    /// Set while the task is completed
    pub completed_at: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task last changed
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Whether the task is completed
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    list_id: Uuid,
    title: String,
    description: Option<String>,
    priority: Option<i16>,
    due_date: Option<NaiveDate>,
    due_time: Option<NaiveTime>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = CoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            list_id: row.list_id,
            title: row.title,
            description: row.description,
            priority: Priority::from_db(row.priority)?,
            due_date: row.due_date,
            due_time: row.due_time,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Which tasks a projection covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// Tasks of a single list
    List(Uuid),

    /// Tasks of every list on a board
    Board(Uuid),
}

/// Input for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    /// Requested title; blank means "New Task"
    pub title: Option<String>,

    pub description: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    pub due_date: Option<NaiveDate>,

    pub due_time: Option<NaiveTime>,
}

impl NewTask {
    /// Builds a pending task in `list_id`
    pub fn into_task(self, list_id: Uuid, now: DateTime<Utc>) -> CoreResult<Task> {
        let title = naming::title_for_create(self.title.as_deref())?;

        Ok(Task {
            id: Uuid::new_v4(),
            list_id,
            title,
            description: naming::normalize(self.description.as_deref()),
            priority: self.priority,
            due_date: self.due_date,
            due_time: self.due_time,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a task
///
/// Nullable fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub due_time: Option<Option<NaiveTime>>,

    /// Completion flag; setting it to the current state is a no-op
    pub completed: Option<bool>,
}

impl UpdateTask {
    /// Applies the update; the task is untouched on validation failure
    pub fn apply(self, task: &mut Task, now: DateTime<Utc>) -> CoreResult<()> {
        let title = self
            .title
            .as_deref()
            .map(|title| naming::name_for_update("title", title))
            .transpose()?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = naming::normalize(description.as_deref());
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(due_time) = self.due_time {
            task.due_time = due_time;
        }
        match self.completed {
            Some(true) if !task.is_completed() => task.completed_at = Some(now),
            Some(false) => task.completed_at = None,
            _ => {}
        }
        task.updated_at = now;
        Ok(())
    }
}

const TASK_COLUMNS: &str =
    "t.id, t.list_id, t.title, t.description, t.priority, t.due_date, t.due_time, t.completed_at, t.created_at, t.updated_at";

impl Task {
    /// Inserts a new task row
    pub async fn insert<'e, E>(executor: E, task: &Task) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks AS t (id, list_id, title, description, priority, due_date, due_time,
                                    completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING t.id, t.list_id, t.title, t.description, t.priority, t.due_date, t.due_time,
                      t.completed_at, t.created_at, t.updated_at
            "#,
        )
        .bind(task.id)
        .bind(task.list_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.to_db())
        .bind(task.due_date)
        .bind(task.due_time)
        .bind(task.completed_at)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(executor)
        .await?;

        row.try_into()
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> CoreResult<Option<Self>>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM tasks t WHERE t.id = $1", TASK_COLUMNS);
        let row = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        row.map(Task::try_from).transpose()
    }

    /// Finds and row-locks a task for the rest of the transaction
    pub async fn find_for_update<'e, E>(executor: E, id: Uuid) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        let sql = format!("SELECT {} FROM tasks t WHERE t.id = $1 FOR UPDATE", TASK_COLUMNS);
        sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| CoreError::not_found("task", id))?
            .try_into()
    }

    /// Writes every mutable column back
    pub async fn save<'e, E>(executor: E, task: &Task) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks AS t
            SET title = $2, description = $3, priority = $4, due_date = $5, due_time = $6,
                completed_at = $7, updated_at = $8
            WHERE t.id = $1
            RETURNING t.id, t.list_id, t.title, t.description, t.priority, t.due_date, t.due_time,
                      t.completed_at, t.created_at, t.updated_at
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.priority.to_db())
        .bind(task.due_date)
        .bind(task.due_time)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CoreError::not_found("task", task.id))?;

        row.try_into()
    }

    /// Deletes a task
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> CoreResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Pending tasks in scope, oldest first
    pub async fn pending_in<'e, E>(executor: E, scope: TaskScope) -> CoreResult<Vec<Self>>
    where
        E: PgExecutor<'e>,
    {
        Self::fetch_scope(
            executor,
            scope,
            "t.completed_at IS NULL",
            "t.created_at ASC, t.id ASC",
        )
        .await
    }

    /// Completed tasks in scope, most recently completed first
    pub async fn completed_in<'e, E>(executor: E, scope: TaskScope) -> CoreResult<Vec<Self>>
    where
        E: PgExecutor<'e>,
    {
        Self::fetch_scope(
            executor,
            scope,
            "t.completed_at IS NOT NULL",
            "t.completed_at DESC, t.created_at ASC, t.id ASC",
        )
        .await
    }

    async fn fetch_scope<'e, E>(
        executor: E,
        scope: TaskScope,
        filter: &str,
        order: &str,
    ) -> CoreResult<Vec<Self>>
    where
        E: PgExecutor<'e>,
    {
        let (join, parent, id) = match scope {
            TaskScope::List(id) => ("", "t.list_id", id),
            TaskScope::Board(id) => ("JOIN lists l ON l.id = t.list_id", "l.board_id", id),
        };
        let sql = format!(
            "SELECT {} FROM tasks t {} WHERE {} = $1 AND {} ORDER BY {}",
            TASK_COLUMNS, join, parent, filter, order
        );

        let rows = sqlx::query_as::<_, TaskRow>(&sql)
            .bind(id)
            .fetch_all(executor)
            .await?;

        rows.into_iter().map(Task::try_from).collect()
    }
}
