/// In-memory store for tests and local development
///
/// All tables sit behind one [`tokio::sync::RwLock`]. Every mutation holds
/// the write lock from first read to last write, which makes each operation
/// atomic and serializes writers; readers run concurrently.
///
/// Boards and tasks are kept in insertion order so that stable sorts break
/// timestamp ties by creation order, matching the Postgres store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
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

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    boards: Vec<Board>,
    lists: HashMap<Uuid, List>,
    tasks: Vec<Task>,
}

impl Tables {
    fn board(&self, id: Uuid) -> CoreResult<&Board> {
        self.boards
            .iter()
            .find(|board| board.id == id)
            .ok_or_else(|| CoreError::not_found("board", id))
    }

    fn list(&self, id: Uuid) -> CoreResult<&List> {
        self.lists.get(&id).ok_or_else(|| CoreError::not_found("list", id))
    }

    fn task_index(&self, id: Uuid) -> CoreResult<usize> {
        self.tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| CoreError::not_found("task", id))
    }

    /// Lists of a board in position order
    fn lists_of(&self, board_id: Uuid) -> Vec<&List> {
        let mut lists: Vec<&List> = self
            .lists
            .values()
            .filter(|list| list.board_id == board_id)
            .collect();
        lists.sort_by_key(|list| list.position);
        lists
    }

    fn tasks_in(&self, scope: TaskScope) -> CoreResult<Vec<Task>> {
        let list_ids: Vec<Uuid> = match scope {
            TaskScope::List(list_id) => vec![self.list(list_id)?.id],
            TaskScope::Board(board_id) => {
                self.board(board_id)?;
                self.lists_of(board_id).into_iter().map(|list| list.id).collect()
            }
        };

        Ok(self
            .tasks
            .iter()
            .filter(|task| list_ids.contains(&task.list_id))
            .cloned()
            .collect())
    }

    fn remove_lists_where(&mut self, doomed: impl Fn(&List) -> bool) {
        let removed: Vec<Uuid> = self
            .lists
            .values()
            .filter(|list| doomed(list))
            .map(|list| list.id)
            .collect();
        for id in &removed {
            self.lists.remove(id);
        }
        self.tasks.retain(|task| !removed.contains(&task.list_id));
    }

    fn remove_boards_where(&mut self, doomed: impl Fn(&Board) -> bool) {
        let removed: Vec<Uuid> = self
            .boards
            .iter()
            .filter(|board| doomed(board))
            .map(|board| board.id)
            .collect();
        self.boards.retain(|board| !removed.contains(&board.id));
        self.remove_lists_where(|list| removed.contains(&list.board_id));
    }
}

/// Process-local store
pub struct MemoryStore {
    tables: RwLock<Tables>,
    clock: SharedClock,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new(clock: SharedClock) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
        }
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_or_create_by_external_auth_id(&self, identity: ExternalIdentity) -> CoreResult<User> {
        let mut tables = self.tables.write().await;
        let now = self.clock.utc();

        let existing = tables
            .users
            .values()
            .find(|user| user.external_auth_id == identity.external_auth_id)
            .map(|user| user.id);

        if let Some(id) = existing {
            let email = identity.email.trim();
            if tables.users.values().any(|other| other.id != id && other.email == email) {
                return Err(CoreError::validation("email", "email is already taken"));
            }

            let Some(user) = tables.users.get_mut(&id) else {
                return Err(CoreError::not_found("user", id));
            };
            if user.sync_from(&identity, now)? {
                info!(user_id = %user.id, "Synced user from identity");
            }
            return Ok(user.clone());
        }

        let user = identity.into_user(now)?;
        if tables.users.values().any(|other| other.email == user.email) {
            return Err(CoreError::validation("email", "email is already taken"));
        }

        info!(user_id = %user.id, "Provisioned user");
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find(&self, id: Uuid) -> CoreResult<User> {
        let tables = self.tables.read().await;
        tables
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found("user", id))
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .users
            .remove(&id)
            .ok_or_else(|| CoreError::not_found("user", id))?;
        tables.remove_boards_where(|board| board.owner_id == id);

        info!(user_id = %id, "Deleted user");
        Ok(())
    }
}

#[async_trait]
impl BoardRepository for MemoryStore {
    async fn create(&self, owner_id: Uuid, new_board: NewBoard) -> CoreResult<Board> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&owner_id) {
            return Err(CoreError::not_found("user", owner_id));
        }

        let siblings = tables
            .boards
            .iter()
            .filter(|board| board.owner_id == owner_id)
            .map(|board| board.name.as_str());
        let board = new_board.into_board(owner_id, siblings, self.clock.utc())?;

        info!(board_id = %board.id, owner_id = %owner_id, "Created board");
        tables.boards.push(board.clone());
        Ok(board)
    }

    async fn find(&self, id: Uuid) -> CoreResult<Board> {
        let tables = self.tables.read().await;
        tables.board(id).cloned()
    }

    async fn boards_of(&self, owner_id: Uuid) -> CoreResult<Vec<Board>> {
        let tables = self.tables.read().await;
        let mut boards: Vec<Board> = tables
            .boards
            .iter()
            .filter(|board| board.owner_id == owner_id)
            .cloned()
            .collect();
        boards.sort_by_key(|board| board.created_at);
        Ok(boards)
    }

    async fn snapshot(&self, id: Uuid) -> CoreResult<BoardSnapshot> {
        let tables = self.tables.read().await;
        let board = tables.board(id)?.clone();
        let lists = tables.lists_of(id).into_iter().cloned().collect();
        let tasks = tables.tasks_in(TaskScope::Board(id))?;

        Ok(BoardSnapshot {
            board,
            lists,
            pending: lifecycle::pending(tasks.iter().cloned()),
            completed: lifecycle::completed(tasks),
        })
    }

    async fn rename(&self, id: Uuid, name: &str) -> CoreResult<Board> {
        let mut tables = self.tables.write().await;
        let now = self.clock.utc();
        let board = tables
            .boards
            .iter_mut()
            .find(|board| board.id == id)
            .ok_or_else(|| CoreError::not_found("board", id))?;

        board.rename(name, now)?;
        info!(board_id = %id, "Renamed board");
        Ok(board.clone())
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.board(id)?;
        tables.remove_boards_where(|board| board.id == id);

        info!(board_id = %id, "Deleted board");
        Ok(())
    }
}

#[async_trait]
impl ListRepository for MemoryStore {
    async fn insert(&self, board_id: Uuid, new_list: NewList) -> CoreResult<List> {
        let mut tables = self.tables.write().await;
        tables.board(board_id)?;

        let siblings = tables.lists_of(board_id);
        let position = ordering::next_position(siblings.last().map(|list| list.position));
        let names = siblings.iter().map(|list| list.name.as_str());
        let list = new_list.into_list(board_id, position, names, self.clock.utc())?;

        info!(list_id = %list.id, board_id = %board_id, position, "Inserted list");
        tables.lists.insert(list.id, list.clone());
        Ok(list)
    }

    async fn move_to(&self, list_id: Uuid, board_id: Uuid, target: Position) -> CoreResult<List> {
        let mut tables = self.tables.write().await;
        if tables.list(list_id)?.board_id != board_id {
            return Err(CoreError::not_found("list", list_id));
        }

        let current: Vec<(Uuid, i32)> = tables
            .lists_of(board_id)
            .into_iter()
            .map(|list| (list.id, list.position))
            .collect();
        let ids: Vec<Uuid> = current.iter().map(|(id, _)| *id).collect();
        let reordered = ordering::move_within(&ids, list_id, target)
            .ok_or_else(|| CoreError::not_found("list", list_id))?;

        let now = self.clock.utc();
        for (id, position) in ordering::changed_positions(&current, &reordered) {
            if let Some(list) = tables.lists.get_mut(&id) {
                list.position = position;
                list.updated_at = now;
            }
        }

        let moved = tables.list(list_id)?.clone();
        info!(list_id = %list_id, board_id = %board_id, position = moved.position, "Moved list");
        Ok(moved)
    }

    async fn remove(&self, list_id: Uuid) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        let removed = tables.list(list_id)?.clone();

        tables.remove_lists_where(|list| list.id == list_id);
        for list in tables.lists.values_mut() {
            if list.board_id == removed.board_id && list.position > removed.position {
                list.position -= 1;
            }
        }

        info!(list_id = %list_id, board_id = %removed.board_id, "Removed list");
        Ok(())
    }

    async fn positions_of(&self, board_id: Uuid) -> CoreResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        tables.board(board_id)?;
        Ok(tables.lists_of(board_id).into_iter().map(|list| list.id).collect())
    }

    async fn lists_of(&self, board_id: Uuid) -> CoreResult<Vec<List>> {
        let tables = self.tables.read().await;
        tables.board(board_id)?;
        Ok(tables.lists_of(board_id).into_iter().cloned().collect())
    }

    async fn find(&self, list_id: Uuid) -> CoreResult<List> {
        let tables = self.tables.read().await;
        tables.list(list_id).cloned()
    }

    async fn update(&self, list_id: Uuid, update: UpdateList) -> CoreResult<List> {
        let mut tables = self.tables.write().await;
        let now = self.clock.utc();
        let list = tables
            .lists
            .get_mut(&list_id)
            .ok_or_else(|| CoreError::not_found("list", list_id))?;

        update.apply(list, now)?;
        info!(list_id = %list_id, "Updated list");
        Ok(list.clone())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create(&self, list_id: Uuid, new_task: NewTask) -> CoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.list(list_id)?;

        let task = new_task.into_task(list_id, self.clock.utc())?;
        info!(task_id = %task.id, list_id = %list_id, "Created task");
        tables.tasks.push(task.clone());
        Ok(task)
    }

    async fn find(&self, id: Uuid) -> CoreResult<Task> {
        let tables = self.tables.read().await;
        let index = tables.task_index(id)?;
        Ok(tables.tasks[index].clone())
    }

    async fn update(&self, id: Uuid, update: UpdateTask) -> CoreResult<Task> {
        let mut tables = self.tables.write().await;
        let index = tables.task_index(id)?;
        let task = &mut tables.tasks[index];

        update.apply(task, self.clock.utc())?;
        info!(task_id = %id, "Updated task");
        Ok(task.clone())
    }

    async fn delete(&self, id: Uuid) -> CoreResult<()> {
        let mut tables = self.tables.write().await;
        let index = tables.task_index(id)?;
        tables.tasks.remove(index);

        info!(task_id = %id, "Deleted task");
        Ok(())
    }

    async fn toggle_complete(&self, id: Uuid) -> CoreResult<Task> {
        let mut tables = self.tables.write().await;
        let index = tables.task_index(id)?;
        let task = &mut tables.tasks[index];

        let state = lifecycle::toggle_complete(task, self.clock.utc());
        info!(task_id = %id, state = ?state, "Toggled task completion");
        Ok(task.clone())
    }

    async fn snooze(&self, id: Uuid, days: u64) -> CoreResult<Task> {
        let mut tables = self.tables.write().await;
        let index = tables.task_index(id)?;
        let task = &mut tables.tasks[index];

        if lifecycle::snooze(task, days, self.clock.utc())? {
            info!(task_id = %id, days, due_date = ?task.due_date, "Snoozed task");
        } else {
            debug!(task_id = %id, "Snooze skipped, task has no due date");
        }
        Ok(task.clone())
    }

    async fn pending(&self, scope: TaskScope) -> CoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(lifecycle::pending(tables.tasks_in(scope)?))
    }

    async fn completed(&self, scope: TaskScope) -> CoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(lifecycle::completed(tables.tasks_in(scope)?))
    }
}
