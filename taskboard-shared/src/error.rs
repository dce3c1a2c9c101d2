/// Core error type shared by every repository backend
///
/// All board, list and task operations return [`CoreResult`]. The four
/// variants map one-to-one onto how a caller is expected to react:
///
/// - `Validation`: re-prompt the user, nothing was persisted
/// - `NotFound`: propagate, never retry
/// - `ConcurrencyConflict`: retry the whole operation once
/// - `Storage`: surface to the user, never retry
///
/// # Example
///
/// ```
/// use taskboard_shared::error::CoreError;
/// use uuid::Uuid;
///
/// let err = CoreError::not_found("list", Uuid::nil());
/// assert!(!err.is_retryable());
/// ```

use uuid::Uuid;

/// Result alias used across the core
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by the ordering and lifecycle core
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Input failed a non-empty or length invariant
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// Offending field
        field: &'static str,

        /// Human-readable reason
        message: String,
    },

    /// Referenced parent or item does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind ("board", "list", ...)
        entity: &'static str,

        /// Requested ID
        id: Uuid,
    },

    /// A concurrent writer won a race the lock could not resolve
    #[error("Concurrent modification conflict: {0}")]
    ConcurrencyConflict(String),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Shorthand for a validation failure
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Shorthand for a missing entity
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        CoreError::NotFound { entity, id }
    }

    /// Whether the caller should retry the whole operation
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConcurrencyConflict(_))
    }
}

/// SQLSTATE codes that signal a lost race rather than a broken request
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Constraint guarding dense list positions
pub(crate) const LIST_POSITION_CONSTRAINT: &str = "lists_board_position_key";

/// Constraint hit when two first logins for one identity race
const USER_IDENTITY_CONSTRAINT: &str = "users_external_auth_id_key";

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code();
                match code.as_deref() {
                    Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => {
                        CoreError::ConcurrencyConflict(db_err.message().to_string())
                    }
                    Some(UNIQUE_VIOLATION) => match db_err.constraint() {
                        Some(LIST_POSITION_CONSTRAINT) => CoreError::ConcurrencyConflict(
                            "list positions changed concurrently".to_string(),
                        ),
                        Some(USER_IDENTITY_CONSTRAINT) => CoreError::ConcurrencyConflict(
                            "user was provisioned concurrently".to_string(),
                        ),
                        Some(constraint) if constraint.contains("email") => {
                            CoreError::validation("email", "email is already taken")
                        }
                        Some(constraint) => CoreError::validation(
                            "unique",
                            format!("constraint violated: {}", constraint),
                        ),
                        None => CoreError::Storage(db_err.message().to_string()),
                    },
                    // Parent deleted between our existence check and the insert
                    Some(FOREIGN_KEY_VIOLATION) => CoreError::ConcurrencyConflict(
                        "referenced row was removed concurrently".to_string(),
                    ),
                    _ => CoreError::Storage(db_err.to_string()),
                }
            }
            other => CoreError::Storage(other.to_string()),
        }
    }
}
