/// Database layer for Taskboard
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Embedded schema migrations
///
/// Models and their SQL live in [`crate::models`]; the transactional
/// repository built on top of them is [`crate::repository::postgres`].

pub mod migrations;
pub mod pool;
