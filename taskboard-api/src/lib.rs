//! # Taskboard API Server Library
//!
//! HTTP layer over the `taskboard-shared` repositories.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `retry`: Retry-once policy for concurrency conflicts
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod retry;
pub mod routes;
