/// Storage-agnostic repository traits
///
/// The four traits are the seam between callers (the HTTP layer, tests)
/// and the two backends:
///
/// - [`postgres::PgStore`]: sqlx transactions with row locks
/// - [`memory::MemoryStore`]: a single async lock over in-process tables
///
/// Both share the pure rules in [`crate::ordering`], [`crate::lifecycle`]
/// and the model constructors, so they agree on every observable result.
///
/// # Example
///
/// ```
/// use taskboard_shared::models::board::NewBoard;
/// use taskboard_shared::models::list::NewList;
/// use taskboard_shared::models::user::ExternalIdentity;
/// use taskboard_shared::repository::Repositories;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), taskboard_shared::error::CoreError> {
/// let repos = Repositories::in_memory();
/// let user = repos
///     .users
///     .find_or_create_by_external_auth_id(ExternalIdentity {
///         external_auth_id: "auth0|1".to_string(),
///         email: "ada@example.com".to_string(),
///         name: None,
///     })
///     .await?;
///
/// let board = repos.boards.create(user.id, NewBoard::default()).await?;
/// let todo = repos.lists.insert(board.id, NewList::default()).await?;
/// assert_eq!(todo.position, 1);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::board::{Board, NewBoard};
use crate::models::list::{List, NewList, UpdateList};
use crate::models::task::{NewTask, Task, TaskScope, UpdateTask};
use crate::models::user::{ExternalIdentity, User};
use crate::ordering::Position;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Time source shared by a store
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Everything on a board, read together
#[derive(Debug, Clone)]
pub struct BoardSnapshot {
    pub board: Board,

    /// In position order
    pub lists: Vec<List>,

    /// Board-wide pending projection
    pub pending: Vec<Task>,

    /// Board-wide completed projection
    pub completed: Vec<Task>,
}

/// Accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns the user for a verified identity, creating it on first sight
    ///
    /// Existing users get their name and email synced.
    async fn find_or_create_by_external_auth_id(&self, identity: ExternalIdentity) -> CoreResult<User>;

    /// Finds a user by ID
    async fn find(&self, id: Uuid) -> CoreResult<User>;

    /// Deletes a user and everything they own
    async fn delete(&self, id: Uuid) -> CoreResult<()>;
}

/// Boards owned by users
#[async_trait]
pub trait BoardRepository: Send + Sync {
    /// Creates a board; a blank name becomes a unique "New Board"
    async fn create(&self, owner_id: Uuid, new_board: NewBoard) -> CoreResult<Board>;

    async fn find(&self, id: Uuid) -> CoreResult<Board>;

    /// Owner's boards, oldest first
    async fn boards_of(&self, owner_id: Uuid) -> CoreResult<Vec<Board>>;

    /// Board, lists and both task projections as of one instant
    async fn snapshot(&self, id: Uuid) -> CoreResult<BoardSnapshot>;

    async fn rename(&self, id: Uuid, name: &str) -> CoreResult<Board>;

    /// Deletes a board with its lists and tasks
    async fn delete(&self, id: Uuid) -> CoreResult<()>;
}

/// Ordered lists within a board
///
/// Every mutation keeps the board's positions at exactly `1..=N`, even with
/// concurrent writers on the same board.
#[async_trait]
pub trait ListRepository: Send + Sync {
    /// Appends a list after the board's last one
    async fn insert(&self, board_id: Uuid, new_list: NewList) -> CoreResult<List>;

    /// Moves a list to `target`, clamped to `[1, sibling_count]`
    ///
    /// A list that is not on `board_id` is reported as not found.
    async fn move_to(&self, list_id: Uuid, board_id: Uuid, target: Position) -> CoreResult<List>;

    /// Deletes a list with its tasks and closes the gap
    async fn remove(&self, list_id: Uuid) -> CoreResult<()>;

    /// List IDs in position order
    async fn positions_of(&self, board_id: Uuid) -> CoreResult<Vec<Uuid>>;

    /// Lists in position order
    async fn lists_of(&self, board_id: Uuid) -> CoreResult<Vec<List>>;

    async fn find(&self, list_id: Uuid) -> CoreResult<List>;

    /// Renames or recolors a list; position is untouched
    async fn update(&self, list_id: Uuid, update: UpdateList) -> CoreResult<List>;
}

/// Tasks and their completion lifecycle
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, list_id: Uuid, new_task: NewTask) -> CoreResult<Task>;

    async fn find(&self, id: Uuid) -> CoreResult<Task>;

    async fn update(&self, id: Uuid, update: UpdateTask) -> CoreResult<Task>;

    async fn delete(&self, id: Uuid) -> CoreResult<()>;

    /// Pending becomes completed and vice versa
    async fn toggle_complete(&self, id: Uuid) -> CoreResult<Task>;

    /// Defers the due date by `days`; tasks without one come back unchanged
    async fn snooze(&self, id: Uuid, days: u64) -> CoreResult<Task>;

    /// Pending tasks in scope, oldest first
    async fn pending(&self, scope: TaskScope) -> CoreResult<Vec<Task>>;

    /// Completed tasks in scope, most recently completed first
    async fn completed(&self, scope: TaskScope) -> CoreResult<Vec<Task>>;
}

/// A store implementing every repository
pub trait Store: UserRepository + BoardRepository + ListRepository + TaskRepository {}

impl<T> Store for T where T: UserRepository + BoardRepository + ListRepository + TaskRepository {}

#[derive(Clone)]
enum Backend {
    Postgres(PgPool),
    Memory,
}

/// One backend behind all four repository traits
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub boards: Arc<dyn BoardRepository>,
    pub lists: Arc<dyn ListRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    backend: Backend,
}

impl Repositories {
    /// Postgres-backed repositories
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool.clone(), Arc::new(DefaultClock)));
        Self::from_store(store, Backend::Postgres(pool))
    }

    /// Empty in-memory repositories on the wall clock
    pub fn in_memory() -> Self {
        Self::in_memory_with_clock(Arc::new(DefaultClock))
    }

    /// Empty in-memory repositories on a caller-controlled clock
    pub fn in_memory_with_clock(clock: SharedClock) -> Self {
        Self::from_store(Arc::new(MemoryStore::new(clock)), Backend::Memory)
    }

    fn from_store<S: Store + 'static>(store: Arc<S>, backend: Backend) -> Self {
        Self {
            users: store.clone(),
            boards: store.clone(),
            lists: store.clone(),
            tasks: store,
            backend,
        }
    }

    /// Short name of the backend, for logs and health output
    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Postgres(_) => "postgres",
            Backend::Memory => "memory",
        }
    }

    /// Checks that the backend can serve requests
    pub async fn ping(&self) -> CoreResult<()> {
        match &self.backend {
            Backend::Postgres(pool) => crate::db::pool::health_check(pool)
                .await
                .map_err(|e| CoreError::Storage(e.to_string())),
            Backend::Memory => Ok(()),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories")
            .field("backend", &self.backend_name())
            .finish()
    }
}
