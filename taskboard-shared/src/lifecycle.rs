/// Task completion state machine and read projections
///
/// A task is either pending (`completed_at` is `None`) or completed. The
/// transitions here are pure; the repositories load the task under a row
/// lock, apply a transition and write it back.
///
/// ```text
///             toggle_complete
///   Pending  ─────────────────▶  Completed
///            ◀─────────────────
///             toggle_complete
/// ```
///
/// `snooze` moves the due date and never changes the state.

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::task::Task;

/// Days a snooze defers by when the caller does not say
pub const DEFAULT_SNOOZE_DAYS: u64 = 1;

/// Completion state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionState {
    Pending,
    Completed,
}

impl CompletionState {
    /// State of `task`
    pub fn of(task: &Task) -> Self {
        if task.is_completed() {
            CompletionState::Completed
        } else {
            CompletionState::Pending
        }
    }
}

/// Flips the completion state and returns the new one
pub fn toggle_complete(task: &mut Task, now: DateTime<Utc>) -> CompletionState {
    task.completed_at = match task.completed_at {
        Some(_) => None,
        None => Some(now),
    };
    task.updated_at = now;
    CompletionState::of(task)
}

/// Pushes the due date back by `days`
///
/// Tasks without a due date are left exactly as they were and `false` is
/// returned.
pub fn snooze(task: &mut Task, days: u64, now: DateTime<Utc>) -> CoreResult<bool> {
    let Some(due_date) = task.due_date else {
        return Ok(false);
    };
    if days == 0 {
        return Ok(false);
    }

    let snoozed = due_date
        .checked_add_days(Days::new(days))
        .ok_or_else(|| CoreError::validation("due_date", "snoozed due date is out of range"))?;

    task.due_date = Some(snoozed);
    task.updated_at = now;
    Ok(true)
}

/// Pending tasks, oldest first
///
/// The sort is stable, so tasks created at the same instant keep the order
/// they were given in.
pub fn pending(tasks: impl IntoIterator<Item = Task>) -> Vec<Task> {
    let mut pending: Vec<Task> = tasks.into_iter().filter(|task| !task.is_completed()).collect();
    pending.sort_by_key(|task| task.created_at);
    pending
}

/// Completed tasks, most recently completed first
pub fn completed(tasks: impl IntoIterator<Item = Task>) -> Vec<Task> {
    let mut completed: Vec<Task> = tasks.into_iter().filter(Task::is_completed).collect();
    completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    completed
}
