//! # Taskboard Shared Library
//!
//! Domain core of the Taskboard Kanban backend: users own boards, boards
//! hold ordered lists, lists hold tasks.
//!
//! ## Module Organization
//!
//! - `ordering`: Dense 1-based positions of lists within a board
//! - `lifecycle`: Task completion state machine, snooze and projections
//! - `naming`: Default and validated names
//! - `models`: Data types and their SQL
//! - `repository`: Storage-agnostic traits with Postgres and in-memory stores
//! - `db`: Connection pool and migrations
//! - `auth`: Access tokens and Axum authentication middleware
//! - `error`: Core error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod naming;
pub mod ordering;
pub mod repository;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
