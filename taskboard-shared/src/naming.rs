/// Name defaulting and validation for boards, lists and tasks
///
/// Blank names on create fall back to a default. Board and list defaults
/// are uniquified among their siblings ("New List", "New List 2", ...);
/// task titles are not. Blank names on update are rejected.

use crate::error::{CoreError, CoreResult};

/// Default name for a board created without one
pub const DEFAULT_BOARD_NAME: &str = "New Board";

/// Default name for a list created without one
pub const DEFAULT_LIST_NAME: &str = "New List";

/// Default title for a task created without one
pub const DEFAULT_TASK_TITLE: &str = "New Task";

/// Longest accepted name or title, in characters
pub const MAX_NAME_LENGTH: usize = 255;

/// Trims `input`, returning `None` when nothing is left
pub fn normalize(input: Option<&str>) -> Option<String> {
    input
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

/// Resolves the name of a new board or list
///
/// `taken` holds the names already used by siblings; it only matters when
/// the default is applied.
pub fn name_for_create<'a, I>(
    field: &'static str,
    requested: Option<&str>,
    default: &str,
    taken: I,
) -> CoreResult<String>
where
    I: IntoIterator<Item = &'a str>,
{
    match normalize(requested) {
        Some(name) => check_length(field, name),
        None => Ok(uniquify(default, taken)),
    }
}

/// Resolves the title of a new task
pub fn title_for_create(requested: Option<&str>) -> CoreResult<String> {
    match normalize(requested) {
        Some(title) => check_length("title", title),
        None => Ok(DEFAULT_TASK_TITLE.to_string()),
    }
}

/// Validates a rename; blank input is an error rather than a default
pub fn name_for_update(field: &'static str, requested: &str) -> CoreResult<String> {
    let name = normalize(Some(requested))
        .ok_or_else(|| CoreError::validation(field, "must not be blank"))?;
    check_length(field, name)
}

fn check_length(field: &'static str, name: String) -> CoreResult<String> {
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::validation(
            field,
            format!("must be at most {} characters", MAX_NAME_LENGTH),
        ));
    }
    Ok(name)
}

fn uniquify<'a, I>(base: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let taken: Vec<&str> = taken.into_iter().collect();
    if !taken.contains(&base) {
        return base.to_string();
    }

    (2..)
        .map(|suffix| format!("{} {}", base, suffix))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| base.to_string())
}
