/// List model and database operations
///
/// Lists are the named, colored columns of a board. Their left-to-right
/// order is the dense `position` column maintained by the repositories
/// (see [`crate::ordering`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE lists (
///     id UUID PRIMARY KEY,
///     board_id UUID NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL CHECK (btrim(name) <> ''),
///     color VARCHAR(16) CHECK (color IN ('gray', 'red', ...)),
///     position INTEGER NOT NULL CHECK (position >= 1),
///     created_at TIMESTAMPTZ NOT NULL,
///     updated_at TIMESTAMPTZ NOT NULL,
///     CONSTRAINT lists_board_position_key UNIQUE (board_id, position)
///         DEFERRABLE INITIALLY DEFERRED
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::naming::{self, DEFAULT_LIST_NAME};

/// Accent color of a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListColor {
    Gray,
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
}

impl ListColor {
    /// Every color, in palette order
    pub const ALL: [ListColor; 8] = [
        ListColor::Gray,
        ListColor::Red,
        ListColor::Orange,
        ListColor::Yellow,
        ListColor::Green,
        ListColor::Blue,
        ListColor::Purple,
        ListColor::Pink,
    ];

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ListColor::Gray => "gray",
            ListColor::Red => "red",
            ListColor::Orange => "orange",
            ListColor::Yellow => "yellow",
            ListColor::Green => "green",
            ListColor::Blue => "blue",
            ListColor::Purple => "purple",
            ListColor::Pink => "pink",
        }
    }
}

impl fmt::Display for ListColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListColor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ListColor::ALL
            .into_iter()
            .find(|color| color.as_str() == s)
            .ok_or_else(|| CoreError::validation("color", format!("unknown color: {}", s)))
    }
}

/// Ordered column within a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    /// Unique list ID
    pub id: Uuid,

    /// Parent board
    pub board_id: Uuid,

    /// Display name, never blank
    pub name: String,

    /// Optional accent color
    pub color: Option<ListColor>,

    /// Dense 1-based rank within the board
    pub position: i32,

    /// When the list was created
    pub created_at: DateTime<Utc>,

    /// When the list was last renamed, recolored or moved
    pub updated_at: DateTime<Utc>,
}

/// Raw row; `color` is decoded explicitly
#[derive(Debug, sqlx::FromRow)]
struct ListRow {
    id: Uuid,
    board_id: Uuid,
    name: String,
    color: Option<String>,
    position: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListRow> for List {
    type Error = CoreError;

    fn try_from(row: ListRow) -> Result<Self, Self::Error> {
        let color = row
            .color
            .as_deref()
            .map(ListColor::from_str)
            .transpose()
            .map_err(|_| CoreError::Storage(format!("list {} has an invalid color", row.id)))?;

        Ok(List {
            id: row.id,
            board_id: row.board_id,
            name: row.name,
            color,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for creating a list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewList {
    /// Requested name; blank means "use the default"
    pub name: Option<String>,

    /// Optional accent color
    pub color: Option<ListColor>,
}

impl NewList {
    /// Builds the list row at `position`
    ///
    /// `sibling_names` are the names of lists already on the board.
    pub fn into_list<'a, I>(
        self,
        board_id: Uuid,
        position: i32,
        sibling_names: I,
        now: DateTime<Utc>,
    ) -> CoreResult<List>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let name = naming::name_for_create("name", self.name.as_deref(), DEFAULT_LIST_NAME, sibling_names)?;

        Ok(List {
            id: Uuid::new_v4(),
            board_id,
            name,
            color: self.color,
            position,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update of a list
///
/// Position is deliberately absent: reordering goes through `move_to`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateList {
    /// New name
    pub name: Option<String>,

    /// New color (use Some(None) to clear)
    pub color: Option<Option<ListColor>>,
}

impl UpdateList {
    /// Applies the update; the list is untouched on validation failure
    pub fn apply(self, list: &mut List, now: DateTime<Utc>) -> CoreResult<()> {
        let name = self
            .name
            .as_deref()
            .map(|name| naming::name_for_update("name", name))
            .transpose()?;

        if let Some(name) = name {
            list.name = name;
        }
        if let Some(color) = self.color {
            list.color = color;
        }
        list.updated_at = now;
        Ok(())
    }
}

impl List {
    /// Inserts a new list row
    pub async fn insert<'e, E>(executor: E, list: &List) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, ListRow>(
            r#"
            INSERT INTO lists (id, board_id, name, color, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, board_id, name, color, position, created_at, updated_at
            "#,
        )
        .bind(list.id)
        .bind(list.board_id)
        .bind(&list.name)
        .bind(list.color.map(|color| color.as_str()))
        .bind(list.position)
        .bind(list.created_at)
        .bind(list.updated_at)
        .fetch_one(executor)
        .await?;

        row.try_into()
    }

    /// Finds a list by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> CoreResult<Option<Self>>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, ListRow>(
            r#"
            SELECT id, board_id, name, color, position, created_at, updated_at
            FROM lists
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        row.map(List::try_from).transpose()
    }

    /// Lists a board's lists in position order
    pub async fn list_by_board<'e, E>(executor: E, board_id: Uuid) -> CoreResult<Vec<Self>>
    where
        E: PgExecutor<'e>,
    {
        let rows = sqlx::query_as::<_, ListRow>(
            r#"
            SELECT id, board_id, name, color, position, created_at, updated_at
            FROM lists
            WHERE board_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(executor)
        .await?;

        rows.into_iter().map(List::try_from).collect()
    }

    /// Writes name and color back; position is left alone
    pub async fn save<'e, E>(executor: E, list: &List) -> CoreResult<Self>
    where
        E: PgExecutor<'e>,
    {
        let row = sqlx::query_as::<_, ListRow>(
            r#"
            UPDATE lists
            SET name = $2, color = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, board_id, name, color, position, created_at, updated_at
            "#,
        )
        .bind(list.id)
        .bind(&list.name)
        .bind(list.color.map(|color| color.as_str()))
        .bind(list.updated_at)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| CoreError::not_found("list", list.id))?;

        row.try_into()
    }

    /// Rewrites positions for several lists in one statement
    pub async fn set_positions<'e, E>(
        executor: E,
        positions: &[(Uuid, i32)],
        now: DateTime<Utc>,
    ) -> CoreResult<u64>
    where
        E: PgExecutor<'e>,
    {
        let (ids, values): (Vec<Uuid>, Vec<i32>) = positions.iter().copied().unzip();

        let result = sqlx::query(
            r#"
            UPDATE lists AS l
            SET position = v.position, updated_at = $3
            FROM UNNEST($1::uuid[], $2::int4[]) AS v(id, position)
            WHERE l.id = v.id
            "#,
        )
        .bind(ids)
        .bind(values)
        .bind(now)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes a list; its tasks go with it
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> CoreResult<bool>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM lists WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Closes the gap left by a deleted list
    pub async fn compact_after<'e, E>(
        executor: E,
        board_id: Uuid,
        removed_position: i32,
    ) -> CoreResult<u64>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            r#"
            UPDATE lists
            SET position = position - 1
            WHERE board_id = $1 AND position > $2
            "#,
        )
        .bind(board_id)
        .bind(removed_position)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
