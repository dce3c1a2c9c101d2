/// Postgres store
///
/// Each mutation runs in its own transaction. List ordering operations first
/// lock the parent board row (`SELECT ... FOR UPDATE`), so writers on one
/// board queue behind each other while other boards proceed. Task lifecycle
/// updates lock only the task row.
///
/// The `(board_id, position)` unique constraint is deferred to commit, which
/// lets a transaction renumber siblings in any order and turns any race the
/// lock did not cover into [`CoreError::ConcurrencyConflict`].

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use super::{BoardRepository, BoardSnapshot, ListRepository, SharedClock, TaskRepository, UserRepository};
use mockable::Clock;
use crate::error::{CoreError, CoreResult};
use crate::lifecycle;
use crate::models::board::{Board, NewBoard};
use crate::models::list::{List, NewList, UpdateList};
use crate::models::task::{NewTask, Task, TaskScope, UpdateTask};
use crate::models::user::{ExternalIdentity, User};
use crate::ordering::{self, Position};

/// sqlx-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    clock: SharedClock,
}

impl PgStore {
    /// Creates a store over an existing pool
    pub fn new(pool: PgPool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    async fn ensure_scope(&self, scope: TaskScope) -> CoreResult<()> {
        match scope {
            TaskScope::List(id) => {
                List::find_by_id(&self.pool, id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("list", id))?;
            }
            TaskScope::Board(id) => {
                Board::find_by_id(&self.pool, id)
                    .await?
                    .ok_or_else(|| CoreError::not_found("board", id))?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore").field("pool", &self.pool).finish()
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_or_create_by_external_auth_id(&self, identity: ExternalIdentity) -> CoreResult<User> {
        let now = self.clock.utc();
        let mut tx = self.pool.begin().await?;

        let user = match User::find_by_external_auth_id_for_update(&mut *tx, &identity.external_auth_id).await? {
            Some(mut user) => {
                if user.sync_from(&identity, now)? {
                    info!(user_id = %user.id, "Synced user from identity");
                    user = User::save(&mut *tx, &user).await?;
                }
                user
            }
            None => {
                let user = User::insert(&mut *tx, &identity.into_user(now)?).await?;
                info!(user_id = %user.id, "Provisioned user");
                user
            }
        };

        tx.commit().await?;
        Ok(user)
    }

    async fn find(&self, id: Uuid) -> CoreResult<User> {
        User::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", id))
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        if !User::delete(&self.pool, id).await? {
            return Err(CoreError::not_found("user", id));
        }
        info!(user_id = %id, "Deleted user");
        Ok(())
    }
}

#[async_trait]
impl BoardRepository for PgStore {
    async fn create(&self, owner_id: Uuid, new_board: NewBoard) -> CoreResult<Board> {
        let now = self.clock.utc();
        let mut tx = self.pool.begin().await?;

        // Serializes default-name allocation per owner
        User::find_by_id_for_update(&mut *tx, owner_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user", owner_id))?;

        let siblings = Board::list_by_owner(&mut *tx, owner_id).await?;
        let board = new_board.into_board(owner_id, siblings.iter().map(|b| b.name.as_str()), now)?;
        let board = Board::insert(&mut *tx, &board).await?;

        tx.commit().await?;
        info!(board_id = %board.id, owner_id = %owner_id, "Created board");
        Ok(board)
    }

    async fn find(&self, id: Uuid) -> CoreResult<Board> {
        Board::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::not_found("board", id))
    }

    async fn boards_of(&self, owner_id: Uuid) -> CoreResult<Vec<Board>> {
        Board::list_by_owner(&self.pool, owner_id).await
    }

    async fn snapshot(&self, id: Uuid) -> CoreResult<BoardSnapshot> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let board = Board::find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("board", id))?;
        let lists = List::list_by_board(&mut *tx, id).await?;
        let pending = Task::pending_in(&mut *tx, TaskScope::Board(id)).await?;
        let completed = Task::completed_in(&mut *tx, TaskScope::Board(id)).await?;

        tx.commit().await?;
        debug!(board_id = %id, lists = lists.len(), "Loaded board snapshot");
        Ok(BoardSnapshot {
            board,
            lists,
            pending,
            completed,
        })
    }

    async fn rename(&self, id: Uuid, name: &str) -> CoreResult<Board> {
        let now = self.clock.utc();
        let mut tx = self.pool.begin().await?;

        let mut board = Board::lock(&mut *tx, id).await?;
        board.rename(name, now)?;
        let board = Board::save(&mut *tx, &board).await?;

        tx.commit().await?;
        info!(board_id = %id, "Renamed board");
        Ok(board)
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        if !Board::delete(&self.pool, id).await? {
            return Err(CoreError::not_found("board", id));
        }
        info!(board_id = %id, "Deleted board");
        Ok(())
    }
}

#[async_trait]
impl ListRepository for PgStore {
    async fn insert(&self, board_id: Uuid, new_list: NewList) -> CoreResult<List> {
        let now = self.clock.utc();
        let mut tx = self.pool.begin().await?;

        Board::lock(&mut *tx, board_id).await?;
        let siblings = List::list_by_board(&mut *tx, board_id).await?;
        let position = ordering::next_position(siblings.last().map(|list| list.position));
        let names = siblings.iter().map(|list| list.name.as_str());
        let list = new_list.into_list(board_id, position, names, now)?;
        let list = List::insert(&mut *tx, &list).await?;

        tx.commit().await?;
        info!(list_id = %list.id, board_id = %board_id, position, "Inserted list");
        Ok(list)
    }

    async fn move_to(&self, list_id: Uuid, board_id: Uuid, target: Position) -> CoreResult<List> {
        let now = self.clock.utc();
        let mut tx = self.pool.begin().await?;

        Board::lock(&mut *tx, board_id).await?;
        let siblings = List::list_by_board(&mut *tx, board_id).await?;

        let current: Vec<(Uuid, i32)> = siblings.iter().map(|list| (list.id, list.position)).collect();
        let ids: Vec<Uuid> = siblings.iter().map(|list| list.id).collect();
        let reordered = ordering::move_within(&ids, list_id, target)
            .ok_or_else(|| CoreError::not_found("list", list_id))?;

        let changed = ordering::changed_positions(&current, &reordered);
        if !changed.is_empty() {
            List::set_positions(&mut *tx, &changed, now).await?;
        }
        let moved = List::find_by_id(&mut *tx, list_id)
            .await?
            .ok_or_else(|| CoreError::not_found("list", list_id))?;

        tx.commit().await?;
        info!(
            list_id = %list_id,
            board_id = %board_id,
            position = moved.position,
            shifted = changed.len(),
            "Moved list"
        );
        Ok(moved)
    }

    async fn remove(&self, list_id: Uuid) -> CoreResult<()> {
        let board_id = List::find_by_id(&self.pool, list_id)
            .await?
            .ok_or_else(|| CoreError::not_found("list", list_id))?
            .board_id;

        let mut tx = self.pool.begin().await?;
        Board::lock(&mut *tx, board_id).await?;

        // Re-read under the lock; a concurrent move may have shifted it
        let list = List::find_by_id(&mut *tx, list_id)
            .await?
            .ok_or_else(|| CoreError::not_found("list", list_id))?;
        List::delete(&mut *tx, list_id).await?;
        let shifted = List::compact_after(&mut *tx, board_id, list.position).await?;

        tx.commit().await?;
        info!(list_id = %list_id, board_id = %board_id, shifted, "Removed list");
        Ok(())
    }

    async fn positions_of(&self, board_id: Uuid) -> CoreResult<Vec<Uuid>> {
        let lists = ListRepository::lists_of(self, board_id).await?;
        Ok(lists.into_iter().map(|list| list.id).collect())
    }

    async fn lists_of(&self, board_id: Uuid) -> CoreResult<Vec<List>> {
        self.ensure_scope(TaskScope::Board(board_id)).await?;
        let lists = List::list_by_board(&self.pool, board_id).await?;
        debug!(board_id = %board_id, count = lists.len(), "Loaded lists");
        Ok(lists)
    }

    async fn find(&self, list_id: Uuid) -> CoreResult<List> {
        List::find_by_id(&self.pool, list_id)
            .await?
            .ok_or_else(|| CoreError::not_found("list", list_id))
    }

    async fn update(&self, list_id: Uuid, update: UpdateList) -> CoreResult<List> {
        let now = self.clock.utc();
        let mut list = ListRepository::find(self, list_id).await?;
        update.apply(&mut list, now)?;

        let list = List::save(&self.pool, &list).await?;
        info!(list_id = %list_id, "Updated list");
        Ok(list)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn create(&self, list_id: Uuid, new_task: NewTask) -> CoreResult<Task> {
        self.ensure_scope(TaskScope::List(list_id)).await?;

        let task = new_task.into_task(list_id, self.clock.utc())?;
        let task = Task::insert(&self.pool, &task).await?;
        info!(task_id = %task.id, list_id = %list_id, "Created task");
        Ok(task)
    }

    async fn find(&self, id: Uuid) -> CoreResult<Task> {
        Task::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| CoreError::not_found("task", id))
    }

    async fn update(&self, id: Uuid, update: UpdateTask) -> CoreResult<Task> {
        let now = self.clock.utc();
        let mut tx = self.pool.begin().await?;

        let mut task = Task::find_for_update(&mut *tx, id).await?;
        update.apply(&mut task, now)?;
        let task = Task::save(&mut *tx, &task).await?;

        tx.commit().await?;
        info!(task_id = %id, "Updated task");
        Ok(task)
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        if !Task::delete(&self.pool, id).await? {
            return Err(CoreError::not_found("task", id));
        }
        info!(task_id = %id, "Deleted task");
        Ok(())
    }

    async fn toggle_complete(&self, id: Uuid) -> CoreResult<Task> {
        let now = self.clock.utc();
        let mut tx = self.pool.begin().await?;

        let mut task = Task::find_for_update(&mut *tx, id).await?;
        let state = lifecycle::toggle_complete(&mut task, now);
        let task = Task::save(&mut *tx, &task).await?;

        tx.commit().await?;
        info!(task_id = %id, state = ?state, "Toggled task completion");
        Ok(task)
    }

    async fn snooze(&self, id: Uuid, days: u64) -> CoreResult<Task> {
        let now = self.clock.utc();
        let mut tx = self.pool.begin().await?;

        let mut task = Task::find_for_update(&mut *tx, id).await?;
        if !lifecycle::snooze(&mut task, days, now)? {
            debug!(task_id = %id, "Snooze skipped, task has no due date");
            tx.rollback().await?;
            return Ok(task);
        }
        let task = Task::save(&mut *tx, &task).await?;

        tx.commit().await?;
        info!(task_id = %id, days, due_date = ?task.due_date, "Snoozed task");
        Ok(task)
    }

    async fn pending(&self, scope: TaskScope) -> CoreResult<Vec<Task>> {
        self.ensure_scope(scope).await?;
        Task::pending_in(&self.pool, scope).await
    }

    async fn completed(&self, scope: TaskScope) -> CoreResult<Vec<Task>> {
        self.ensure_scope(scope).await?;
        Task::completed_in(&self.pool, scope).await
    }
}
