/// Database models for Taskboard
///
/// Each model pairs its pure constructors and update rules with the SQL
/// that reads and writes it. The SQL functions are generic over
/// [`sqlx::PgExecutor`], so they run equally on a pool or inside a
/// transaction.
///
/// # Models
///
/// - `user`: Accounts provisioned from an external identity
/// - `board`: Top-level containers owned by a user
/// - `list`: Ordered columns within a board
/// - `task`: Work items within a list
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::board::{Board, NewBoard};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(owner_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let board = NewBoard { name: Some("Home".to_string()) }
///     .into_board(owner_id, [], chrono::Utc::now())?;
/// let board = Board::insert(&pool, &board).await?;
/// # Ok(())
/// # }
/// ```

pub mod board;
pub mod list;
pub mod task;
pub mod user;
