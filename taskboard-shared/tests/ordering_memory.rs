/// List ordering against the in-memory store
///
/// Every test checks that positions stay dense (`1..=N`) after the
/// operation under test.

use std::sync::Arc;
use taskboard_shared::error::CoreError;
use taskboard_shared::models::board::NewBoard;
use taskboard_shared::models::list::{ListColor, NewList, UpdateList};
use taskboard_shared::models::task::{NewTask, TaskScope};
use taskboard_shared::models::user::ExternalIdentity;
use taskboard_shared::ordering::{is_dense, Position};
use taskboard_shared::repository::Repositories;
use uuid::Uuid;

async fn setup() -> (Repositories, Uuid) {
    let repos = Repositories::in_memory();
    let user = repos
        .users
        .find_or_create_by_external_auth_id(ExternalIdentity {
            external_auth_id: "auth0|ordering".to_string(),
            email: "ordering@example.com".to_string(),
            name: Some("Ordering".to_string()),
        })
        .await
        .unwrap();
    let board = repos.boards.create(user.id, NewBoard::default()).await.unwrap();
    (repos, board.id)
}

fn named(name: &str) -> NewList {
    NewList {
        name: Some(name.to_string()),
        color: None,
    }
}

/// Inserts lists A, B, C, ... and returns their IDs in order
async fn insert_all(repos: &Repositories, board_id: Uuid, names: &[&str]) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for name in names {
        ids.push(repos.lists.insert(board_id, named(name)).await.unwrap().id);
    }
    ids
}

async fn names_in_order(repos: &Repositories, board_id: Uuid) -> Vec<String> {
    repos
        .lists
        .lists_of(board_id)
        .await
        .unwrap()
        .into_iter()
        .map(|list| list.name)
        .collect()
}

async fn assert_dense(repos: &Repositories, board_id: Uuid) {
    let positions: Vec<i32> = repos
        .lists
        .lists_of(board_id)
        .await
        .unwrap()
        .iter()
        .map(|list| list.position)
        .collect();
    assert!(is_dense(&positions), "positions not dense: {:?}", positions);
}

#[tokio::test]
async fn test_insert_appends_at_end() {
    let (repos, board_id) = setup().await;

    let first = repos.lists.insert(board_id, NewList::default()).await.unwrap();
    assert_eq!(first.position, 1);
    assert_eq!(first.name, "New List");

    insert_all(&repos, board_id, &["B", "C"]).await;
    let fourth = repos.lists.insert(board_id, NewList::default()).await.unwrap();
    assert_eq!(fourth.position, 4);
    assert_eq!(fourth.name, "New List 2");

    assert_dense(&repos, board_id).await;
}

#[tokio::test]
async fn test_move_last_to_second() {
    let (repos, board_id) = setup().await;
    let ids = insert_all(&repos, board_id, &["A", "B", "C", "D"]).await;

    let moved = repos.lists.move_to(ids[3], board_id, Position::new(2)).await.unwrap();
    assert_eq!(moved.position, 2);

    assert_eq!(names_in_order(&repos, board_id).await, ["A", "D", "B", "C"]);
    assert_dense(&repos, board_id).await;
}

#[tokio::test]
async fn test_move_first_to_last() {
    let (repos, board_id) = setup().await;
    let ids = insert_all(&repos, board_id, &["A", "B", "C", "D"]).await;

    repos.lists.move_to(ids[0], board_id, Position::new(4)).await.unwrap();

    assert_eq!(names_in_order(&repos, board_id).await, ["B", "C", "D", "A"]);
    assert_eq!(
        repos.lists.positions_of(board_id).await.unwrap(),
        vec![ids[1], ids[2], ids[3], ids[0]]
    );
}

#[tokio::test]
async fn test_move_target_is_clamped() {
    let (repos, board_id) = setup().await;
    let ids = insert_all(&repos, board_id, &["A", "B", "C"]).await;

    let moved = repos.lists.move_to(ids[0], board_id, Position::new(99)).await.unwrap();
    assert_eq!(moved.position, 3);

    let moved = repos.lists.move_to(ids[0], board_id, Position::new(-5)).await.unwrap();
    assert_eq!(moved.position, 1);

    assert_eq!(names_in_order(&repos, board_id).await, ["A", "B", "C"]);
    assert_dense(&repos, board_id).await;
}

#[tokio::test]
async fn test_ui_index_zero_is_first_position() {
    let (repos, board_id) = setup().await;
    let ids = insert_all(&repos, board_id, &["A", "B", "C"]).await;

    let moved = repos
        .lists
        .move_to(ids[2], board_id, Position::from_ui_index(0))
        .await
        .unwrap();

    assert_eq!(moved.position, 1);
    assert_eq!(Position::new(moved.position).to_ui_index(), 0);
    assert_eq!(names_in_order(&repos, board_id).await, ["C", "A", "B"]);
}

#[tokio::test]
async fn test_remove_compacts_positions() {
    let (repos, board_id) = setup().await;
    let ids = insert_all(&repos, board_id, &["A", "B", "C"]).await;
    let task = repos.tasks.create(ids[1], NewTask::default()).await.unwrap();

    repos.lists.remove(ids[1]).await.unwrap();

    let lists = repos.lists.lists_of(board_id).await.unwrap();
    let summary: Vec<(&str, i32)> = lists.iter().map(|l| (l.name.as_str(), l.position)).collect();
    assert_eq!(summary, [("A", 1), ("C", 2)]);

    assert!(matches!(
        repos.tasks.find(task.id).await,
        Err(CoreError::NotFound { entity: "task", .. })
    ));
}

#[tokio::test]
async fn test_update_never_touches_position() {
    let (repos, board_id) = setup().await;
    let ids = insert_all(&repos, board_id, &["A", "B"]).await;

    let updated = repos
        .lists
        .update(
            ids[1],
            UpdateList {
                name: Some("Doing".to_string()),
                color: Some(Some(ListColor::Green)),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.position, 2);
    assert_eq!(updated.color, Some(ListColor::Green));

    let err = repos
        .lists
        .update(
            ids[1],
            UpdateList {
                name: Some("  ".to_string()),
                color: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert_eq!(repos.lists.find(ids[1]).await.unwrap().name, "Doing");
}

#[tokio::test]
async fn test_unknown_parent_is_not_found() {
    let (repos, _) = setup().await;
    let missing = Uuid::new_v4();

    assert!(matches!(
        repos.lists.insert(missing, NewList::default()).await,
        Err(CoreError::NotFound { entity: "board", .. })
    ));
    assert!(matches!(
        repos.lists.positions_of(missing).await,
        Err(CoreError::NotFound { .. })
    ));
    assert!(matches!(
        repos.lists.remove(missing).await,
        Err(CoreError::NotFound { entity: "list", .. })
    ));
    assert!(matches!(
        repos.tasks.pending(TaskScope::List(missing)).await,
        Err(CoreError::NotFound { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_get_distinct_positions() {
    let (repos, board_id) = setup().await;

    let a = {
        let repos = repos.clone();
        tokio::spawn(async move { repos.lists.insert(board_id, named("A")).await })
    };
    let b = {
        let repos = repos.clone();
        tokio::spawn(async move { repos.lists.insert(board_id, named("B")).await })
    };

    let (a, b) = futures::future::join(a, b).await;
    let mut positions = vec![a.unwrap().unwrap().position, b.unwrap().unwrap().position];
    positions.sort_unstable();

    assert_eq!(positions, [1, 2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_mixed_writers_keep_positions_dense() {
    let (repos, board_id) = setup().await;
    let ids = insert_all(&repos, board_id, &["A", "B", "C", "D", "E", "F"]).await;
    let repos = Arc::new(repos);

    let mut handles = Vec::new();
    for (i, id) in ids.iter().copied().enumerate() {
        let (mover, inserter) = (repos.clone(), repos.clone());
        handles.push(tokio::spawn(async move {
            if i % 3 == 0 {
                mover.lists.remove(id).await
            } else {
                mover
                    .lists
                    .move_to(id, board_id, Position::from_ui_index(5 - i))
                    .await
                    .map(|_| ())
            }
        }));
        handles.push(tokio::spawn(async move {
            inserter.lists.insert(board_id, NewList::default()).await.map(|_| ())
        }));
    }

    for result in futures::future::join_all(handles).await {
        // A move may race with the removal of the same list; nothing else fails
        match result.unwrap() {
            Ok(()) | Err(CoreError::NotFound { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    let lists = repos.lists.lists_of(board_id).await.unwrap();
    assert_eq!(lists.len(), 6 - 2 + 6);
    assert_dense(&repos, board_id).await;
}
