/// Board model and database operations
///
/// A board is the top-level container owned by a single user. It owns an
/// ordered sequence of lists; deleting a board cascades to its lists and
/// their tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id UUID PRIMARY KEY,
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL CHECK (btrim(name) <> ''),
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::naming::{self, DEFAULT_BOARD_NAME};

/// Board owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Board {
    /// Unique board ID
    pub id: Uuid,

    /// Owning user
    pub owner_id: Uuid,

    /// Display name, never blank
    pub name: String,

    /// When the board was created
    pub created_at: DateTime<Utc>,

    /// When the board was last renamed
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a board
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBoard {
    /// Requested name; blank means "use the default"
    pub name: Option<String>,
}

impl NewBoard {
    /// Builds the board row, defaulting and uniquifying a blank name
    ///
    /// `sibling_names` are the names of the owner's existing boards.
    pub fn into_board<'a, I>(
        self,
        owner_id: Uuid,
        sibling_names: I,
        now: DateTime<Utc>,
    ) -> CoreResult<Board>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let name = naming::name_for_create(
            "name",
            self.name.as_deref(),
            DEFAULT_BOARD_NAME,
            sibling_names,
        )?;

        Ok(Board {
            id: Uuid::new_v4(),
            owner_id,
            name,
            created_at: now,
            updated_at: now,
        })
    }
}

impl Board {
    /// Applies a rename; the board is untouched if the name is invalid
    pub fn rename(&mut self, name: &str, now: DateTime<Utc>) -> CoreResult<()> {
        self.name = naming::name_for_update("name", name)?;
        self.updated_at = now;
        Ok(())
    }

    /// Inserts a new board row
    pub async fn insert<'e, E>(executor: E, board: &Board) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        let board = sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (id, owner_id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, owner_id, name, created_at, updated_at
            "#,
        )
        .bind(board.id)
        .bind(board.owner_id)
        .bind(&board.name)
        .bind(board.created_at)
        .bind(board.updated_at)
        .fetch_one(executor)
        .await?;

        Ok(board)
    }

    /// Finds a board by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> CoreResult<Option<Self>>
    where
        E: PgExecutor<'e>,
    {
        let board = sqlx::query_as::<_, Board>(
            r#"
            SELECT id, owner_id, name, created_at, updated_at
            FROM boards
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(board)
    }

    /// Row-locks a board for the rest of the transaction
    ///
    /// Every mutation of a board's list ordering goes through this lock, so
    /// writers on the same board serialize while other boards proceed.
    pub async fn lock<'e, E>(executor: E, id: Uuid) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Board>(
            r#"
            SELECT id, owner_id, name, created_at, updated_at
            FROM boards
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CoreError::not_found("board", id))
    }

    /// Lists an owner's boards, oldest first
    pub async fn list_by_owner<'e, E>(executor: E, owner_id: Uuid) -> CoreResult<Vec<Self>>
    where
        E: PgExecutor<'e>,
    {
        let boards = sqlx::query_as::<_, Board>(
            r#"
            SELECT id, owner_id, name, created_at, updated_at
            FROM boards
            WHERE owner_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(executor)
        .await?;

        Ok(boards)
    }

    /// Writes a renamed board back
    pub async fn save<'e, E>(executor: E, board: &Board) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Board>(
            r#"
            UPDATE boards
            SET name = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, owner_id, name, created_at, updated_at
            "#,
        )
        .bind(board.id)
        .bind(&board.name)
        .bind(board.updated_at)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CoreError::not_found("board", board.id))
    }

    /// Deletes a board, cascading to lists and tasks
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> CoreResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
