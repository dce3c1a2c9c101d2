/// Dense position arithmetic for ordered siblings
///
/// Lists within a board are ranked by a 1-based, gap-free `position`.
/// This module holds the pure arithmetic; the repository backends wrap it in
/// a per-board lock or transaction and persist the result.
///
/// # Invariant
///
/// For a fixed parent, the stored positions are exactly `1..=N`, where `N`
/// is the number of siblings. Every function here takes a dense ordering and
/// returns a dense ordering.
///
/// # Boundary conversion
///
/// Drag-and-drop clients report a 0-based drop index. [`Position::from_ui_index`]
/// is the single place where that index becomes a stored position.
///
/// # Example
///
/// ```
/// use taskboard_shared::ordering::{move_within, Position};
///
/// let order = vec!['A', 'B', 'C', 'D'];
/// let moved = move_within(&order, 'D', Position::new(2)).unwrap();
/// assert_eq!(moved, vec!['A', 'D', 'B', 'C']);
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// 1-based rank of an item among its siblings
///
/// Values outside `[1, sibling_count]` are accepted on input and clamped by
/// [`Position::clamp_to`]; they are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(i32);

impl Position {
    /// First slot in any non-empty collection
    pub const FIRST: Position = Position(1);

    /// Wraps a raw 1-based position
    pub fn new(value: i32) -> Self {
        Position(value)
    }

    /// Converts a 0-based client drop index into a 1-based position
    pub fn from_ui_index(index: usize) -> Self {
        let index = i32::try_from(index).unwrap_or(i32::MAX - 1);
        Position(index.saturating_add(1))
    }

    /// Converts back to a 0-based index, treating anything below 1 as 0
    pub fn to_ui_index(self) -> usize {
        usize::try_from(self.0.saturating_sub(1)).unwrap_or(0)
    }

    /// Raw value
    pub fn get(self) -> i32 {
        self.0
    }

    /// Clamps into `[1, sibling_count]`
    ///
    /// An empty collection clamps to `FIRST`.
    pub fn clamp_to(self, sibling_count: usize) -> Self {
        let max = i32::try_from(sibling_count).unwrap_or(i32::MAX).max(1);
        Position(self.0.clamp(1, max))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Position> for i32 {
    fn from(position: Position) -> Self {
        position.0
    }
}

/// Position for an item appended after the current maximum
pub fn next_position(current_max: Option<i32>) -> i32 {
    current_max.map_or(1, |max| max.saturating_add(1))
}

/// Reorders `ordered` so that `item` lands on `target`
///
/// Siblings between the old and new slot shift by one to close the gap.
/// Returns `None` when `item` is not among the siblings.
pub fn move_within<T: Copy + PartialEq>(ordered: &[T], item: T, target: Position) -> Option<Vec<T>> {
    let from = ordered.iter().position(|candidate| *candidate == item)?;
    let to = target.clamp_to(ordered.len()).to_ui_index();

    let mut reordered = ordered.to_vec();
    let moved = reordered.remove(from);
    reordered.insert(to, moved);
    Some(reordered)
}

/// Assigns dense positions `1..=N` in iteration order
pub fn renumber<T: Copy>(ordered: &[T]) -> Vec<(T, i32)> {
    ordered
        .iter()
        .zip(1..)
        .map(|(item, position)| (*item, position))
        .collect()
}

/// Entries of `reordered` whose position differs from `current`
///
/// `current` pairs each item with its stored position. Only the returned
/// rows need to be written back.
pub fn changed_positions<T: Copy + PartialEq>(current: &[(T, i32)], reordered: &[T]) -> Vec<(T, i32)> {
    renumber(reordered)
        .into_iter()
        .filter(|(item, position)| {
            current
                .iter()
                .find(|(existing, _)| existing == item)
                .map_or(true, |(_, old)| old != position)
        })
        .collect()
}

/// Whether `positions` is a permutation of `1..=N`
pub fn is_dense(positions: &[i32]) -> bool {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    sorted.iter().zip(1..).all(|(position, expected)| *position == expected)
}
