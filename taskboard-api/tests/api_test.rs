/// API tests for the taskboard server
///
/// Each test drives the full router (auth layer, handlers, error envelope)
/// over a fresh in-memory store.

mod common;

use axum::http::{Request, StatusCode};
use common::{create_user, id_of, token_for, token_for_identity, TestContext};
use taskboard_shared::models::user::ExternalIdentity;
use serde_json::{json, Value};
use uuid::Uuid;

fn names(lists: &Value) -> Vec<String> {
    lists
        .as_array()
        .unwrap()
        .iter()
        .map(|list| list["name"].as_str().unwrap().to_string())
        .collect()
}

fn titles(tasks: &Value) -> Vec<String> {
    tasks
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new().await.unwrap();

    let builder = Request::builder().method("GET").uri("/health");
    let (status, body) = common::send(&ctx.app, builder, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"], "memory");
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let builder = Request::builder().method("GET").uri("/v1/boards");
    let (status, body) = common::send(&ctx.app, builder, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = ctx.send_as("not-a-jwt", "GET", "/v1/boards", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_caller() {
    let ctx = TestContext::new().await.unwrap();

    let (status, body) = ctx.send("GET", "/v1/me", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(id_of(&body), ctx.user.id);
    assert_eq!(body["name"], "ada");
}

#[tokio::test]
async fn test_boards_default_names_are_unique() {
    let ctx = TestContext::new().await.unwrap();

    let (status, first) = ctx.send("POST", "/v1/boards", None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, second) = ctx.send("POST", "/v1/boards", Some(json!({ "name": "  " }))).await;

    assert_eq!(first["name"], "New Board");
    assert_eq!(second["name"], "New Board 2");

    let (status, body) = ctx.send("GET", "/v1/boards", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body["boards"]), ["New Board", "New Board 2"]);
}

#[tokio::test]
async fn test_rename_board_validation() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Groceries").await;
    let uri = format!("/v1/boards/{}", board_id);

    let (status, body) = ctx.send("PATCH", &uri, Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "name");

    let (status, _) = ctx.send("PATCH", &uri, Some(json!({ "name": "" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = ctx.send("PATCH", &uri, Some(json!({ "name": "Errands" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Errands");
}

#[tokio::test]
async fn test_lists_append_and_move() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Sprint").await;

    let todo = ctx.create_list(board_id, "Todo").await;
    let _doing = ctx.create_list(board_id, "Doing").await;
    let done = ctx.create_list(board_id, "Done").await;

    let (status, body) = ctx
        .send("PATCH", &format!("/v1/lists/{}/move", done), Some(json!({ "index": 0 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), ["Done", "Todo", "Doing"]);
    let positions: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|list| list["position"].as_i64().unwrap())
        .collect();
    assert_eq!(positions, [1, 2, 3]);
    assert_eq!(body[0]["index"], 0);

    let (_, body) = ctx
        .send("PATCH", &format!("/v1/lists/{}/move", todo), Some(json!({ "index": 99 })))
        .await;
    assert_eq!(names(&body), ["Done", "Doing", "Todo"]);

    let (_, body) = ctx
        .send("PATCH", &format!("/v1/lists/{}/move", todo), Some(json!({ "index": -5 })))
        .await;
    assert_eq!(names(&body), ["Todo", "Done", "Doing"]);
}

#[tokio::test]
async fn test_delete_list_closes_gap() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Sprint").await;

    ctx.create_list(board_id, "Todo").await;
    let doing = ctx.create_list(board_id, "Doing").await;
    let done = ctx.create_list(board_id, "Done").await;

    let (status, _) = ctx.send("DELETE", &format!("/v1/lists/{}", doing), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = ctx.send("GET", &format!("/v1/lists/{}", done), None).await;
    assert_eq!(body["position"], 2);
    assert_eq!(body["index"], 1);

    let (status, _) = ctx.send("GET", &format!("/v1/lists/{}", doing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_list_keeps_position() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Sprint").await;
    ctx.create_list(board_id, "Todo").await;
    let doing = ctx.create_list(board_id, "Doing").await;
    let uri = format!("/v1/lists/{}", doing);

    let (status, body) = ctx
        .send("PATCH", &uri, Some(json!({ "name": "In progress", "color": "blue" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "In progress");
    assert_eq!(body["color"], "blue");
    assert_eq!(body["position"], 2);

    let (_, body) = ctx.send("PATCH", &uri, Some(json!({ "color": null }))).await;
    assert_eq!(body["color"], Value::Null);
    assert_eq!(body["name"], "In progress");

    let (status, _) = ctx.send("PATCH", &uri, Some(json!({ "color": "magenta" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_default_list_names_are_unique_per_board() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Sprint").await;
    let uri = format!("/v1/boards/{}/lists", board_id);

    let (_, first) = ctx.send("POST", &uri, None).await;
    let (_, second) = ctx.send("POST", &uri, Some(json!({}))).await;

    assert_eq!(first["name"], "New List");
    assert_eq!(second["name"], "New List 2");
    assert_eq!(second["position"], 2);
}

#[tokio::test]
async fn test_toggle_complete_moves_between_buckets() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Home").await;
    let list_id = ctx.create_list(board_id, "Chores").await;

    let dishes = ctx.create_task(list_id, json!({ "title": "Dishes" })).await;
    ctx.create_task(list_id, json!({ "title": "Laundry" })).await;

    let (status, body) = ctx
        .send("PATCH", &format!("/v1/tasks/{}/complete", dishes), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed"], true);
    assert!(body["completed_at"].is_string());

    let (_, buckets) = ctx.send("GET", &format!("/v1/lists/{}/tasks", list_id), None).await;
    assert_eq!(titles(&buckets["pending"]), ["Laundry"]);
    assert_eq!(titles(&buckets["completed"]), ["Dishes"]);

    let (_, body) = ctx
        .send("PATCH", &format!("/v1/tasks/{}/complete", dishes), None)
        .await;
    assert_eq!(body["completed"], false);
    assert_eq!(body["completed_at"], Value::Null);

    let (_, buckets) = ctx.send("GET", &format!("/v1/lists/{}/tasks", list_id), None).await;
    assert_eq!(titles(&buckets["pending"]), ["Dishes", "Laundry"]);
    assert!(buckets["completed"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_snooze_defers_due_date() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Home").await;
    let list_id = ctx.create_list(board_id, "Bills").await;
    let rent = ctx
        .create_task(list_id, json!({ "title": "Rent", "due_date": "2024-02-28" }))
        .await;
    let uri = format!("/v1/tasks/{}/snooze", rent);

    let (status, body) = ctx.send("PATCH", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["due_date"], "2024-02-29");

    let (_, body) = ctx.send("PATCH", &uri, Some(json!({ "days": 3 }))).await;
    assert_eq!(body["due_date"], "2024-03-03");

    let (status, _) = ctx.send("PATCH", &uri, Some(json!({ "days": 0 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_snooze_without_due_date_is_noop() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Home").await;
    let list_id = ctx.create_list(board_id, "Someday").await;
    let task_id = ctx.create_task(list_id, json!({ "title": "Learn piano" })).await;

    let (_, before) = ctx.send("GET", &format!("/v1/tasks/{}", task_id), None).await;
    let (status, after) = ctx
        .send("PATCH", &format!("/v1/tasks/{}/snooze", task_id), None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["due_date"], Value::Null);
    assert_eq!(after["updated_at"], before["updated_at"]);
}

#[tokio::test]
async fn test_update_task_is_partial() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Home").await;
    let list_id = ctx.create_list(board_id, "Errands").await;
    let task_id = ctx
        .create_task(
            list_id,
            json!({ "title": "Post office", "description": "Parcel", "due_date": "2024-05-01" }),
        )
        .await;
    let uri = format!("/v1/tasks/{}", task_id);

    let (status, body) = ctx
        .send("PATCH", &uri, Some(json!({ "priority": "high", "due_date": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Post office");
    assert_eq!(body["description"], "Parcel");
    assert_eq!(body["priority"], "high");
    assert_eq!(body["due_date"], Value::Null);

    let (status, _) = ctx.send("PATCH", &uri, Some(json!({ "title": "   " }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx.send("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = ctx.send("GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_board_detail_and_projections() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Trip").await;
    let pack = ctx.create_list(board_id, "Pack").await;
    let book = ctx.create_list(board_id, "Book").await;

    ctx.create_task(pack, json!({ "title": "Passport" })).await;
    let hotel = ctx.create_task(book, json!({ "title": "Hotel" })).await;
    ctx.create_task(book, json!({})).await;
    ctx.send("PATCH", &format!("/v1/tasks/{}/complete", hotel), None).await;

    let (status, detail) = ctx.send("GET", &format!("/v1/boards/{}", board_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Trip");
    assert_eq!(names(&detail["lists"]), ["Pack", "Book"]);
    assert_eq!(titles(&detail["lists"][0]["pending"]), ["Passport"]);
    assert_eq!(titles(&detail["lists"][1]["pending"]), ["New Task"]);
    assert_eq!(titles(&detail["lists"][1]["completed"]), ["Hotel"]);

    let (_, pending) = ctx
        .send("GET", &format!("/v1/boards/{}/tasks/pending", board_id), None)
        .await;
    assert_eq!(titles(&pending["tasks"]), ["Passport", "New Task"]);

    let (_, completed) = ctx
        .send("GET", &format!("/v1/boards/{}/tasks/completed", board_id), None)
        .await;
    assert_eq!(titles(&completed["tasks"]), ["Hotel"]);
}

#[tokio::test]
async fn test_other_users_resources_are_not_found() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Private").await;
    let list_id = ctx.create_list(board_id, "Secrets").await;
    let task_id = ctx.create_task(list_id, json!({ "title": "Hidden" })).await;

    let intruder = create_user(&ctx.repos, "eve").await.unwrap();
    let token = token_for(&intruder).unwrap();

    for uri in [
        format!("/v1/boards/{}", board_id),
        format!("/v1/lists/{}", list_id),
        format!("/v1/tasks/{}", task_id),
    ] {
        let (status, body) = ctx.send_as(&token, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body["error"], "not_found");
    }

    let (status, _) = ctx
        .send_as(&token, "PATCH", &format!("/v1/tasks/{}/complete", task_id), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, task) = ctx.send("GET", &format!("/v1/tasks/{}", task_id), None).await;
    assert_eq!(task["completed"], false);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.send("GET", &format!("/v1/boards/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send("POST", &format!("/v1/lists/{}/tasks", Uuid::new_v4()), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_board_cascades() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Old").await;
    let list_id = ctx.create_list(board_id, "Stuff").await;
    let task_id = ctx.create_task(list_id, json!({ "title": "Thing" })).await;

    let (status, _) = ctx.send("DELETE", &format!("/v1/boards/{}", board_id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.send("GET", &format!("/v1/lists/{}", list_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = ctx.send("GET", &format!("/v1/tasks/{}", task_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_me_removes_account() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Mine").await;

    let (status, _) = ctx.send("DELETE", "/v1/me", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(ctx.repos.users.find(ctx.user.id).await.is_err());
    assert!(ctx.repos.boards.find(board_id).await.is_err());

    // The token is still valid, so the next request starts a fresh account
    let (status, me) = ctx.send("GET", "/v1/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(id_of(&me), ctx.user.id);
    let (_, boards) = ctx.send("GET", "/v1/boards", None).await;
    assert_eq!(boards["boards"], json!([]));
}

#[tokio::test]
async fn test_first_request_provisions_user() {
    let ctx = TestContext::new().await.unwrap();
    let token = token_for_identity(ExternalIdentity {
        external_auth_id: "google|first-visit".to_string(),
        email: "grace@example.com".to_string(),
        name: None,
    })
    .unwrap();

    let (status, me) = ctx.send_as(&token, "GET", "/v1/me", None).await;
    assert_eq!(status, StatusCode::OK, "{}", me);
    assert_eq!(me["name"], "grace");
    assert_eq!(me["email"], "grace@example.com");

    let user = ctx.repos.users.find(id_of(&me)).await.unwrap();
    assert_eq!(user.external_auth_id, "google|first-visit");

    let (status, board) = ctx.send_as(&token, "POST", "/v1/boards", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(board["owner_id"], me["id"]);

    let (_, again) = ctx.send_as(&token, "GET", "/v1/me", None).await;
    assert_eq!(again["id"], me["id"]);
}

#[tokio::test]
async fn test_returning_user_is_synced_from_token() {
    let ctx = TestContext::new().await.unwrap();
    let token = token_for_identity(ExternalIdentity {
        external_auth_id: ctx.user.external_auth_id.clone(),
        email: "ada.lovelace@example.com".to_string(),
        name: Some("Ada Lovelace".to_string()),
    })
    .unwrap();

    let (status, me) = ctx.send_as(&token, "GET", "/v1/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(id_of(&me), ctx.user.id);
    assert_eq!(me["name"], "Ada Lovelace");
    assert_eq!(me["email"], "ada.lovelace@example.com");
}

#[tokio::test]
async fn test_token_claiming_taken_email_is_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let token = token_for_identity(ExternalIdentity {
        external_auth_id: "github|impostor".to_string(),
        email: ctx.user.email.clone(),
        name: None,
    })
    .unwrap();

    let (status, body) = ctx.send_as(&token, "GET", "/v1/me", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Any").await;

    let builder = Request::builder()
        .method("PATCH")
        .uri(format!("/v1/boards/{}", board_id))
        .header("authorization", ctx.auth_header());
    let request_body = Value::String("{not json".to_string());
    let (status, body) = common::send(&ctx.app, builder, Some(request_body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_wrongly_typed_optional_bodies_are_bad_requests() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Typed").await;
    let list_id = ctx.create_list(board_id, "Inbox").await;
    let task_id = ctx
        .create_task(list_id, json!({ "title": "Stretch", "due_date": "2024-06-01" }))
        .await;

    let cases = [
        ("POST", format!("/v1/lists/{}/tasks", list_id), json!({ "title": 5, "priority": "urgent" })),
        ("PATCH", format!("/v1/tasks/{}/snooze", task_id), json!({ "days": "lots" })),
        ("POST", format!("/v1/boards/{}/lists", board_id), json!({ "color": 12 })),
        ("POST", "/v1/boards".to_string(), json!({ "name": ["x"] })),
    ];
    for (method, uri, body) in cases {
        let (status, response) = ctx.send(method, &uri, Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert_eq!(response["error"], "bad_request");
    }

    let (_, task) = ctx.send("GET", &format!("/v1/tasks/{}", task_id), None).await;
    assert_eq!(task["due_date"], "2024-06-01");
    let (_, tasks) = ctx.send("GET", &format!("/v1/lists/{}/tasks", list_id), None).await;
    assert_eq!(tasks["pending"].as_array().unwrap().len(), 1);
    let (_, boards) = ctx.send("GET", "/v1/boards", None).await;
    assert_eq!(boards["boards"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_optional_bodies_use_defaults() {
    let ctx = TestContext::new().await.unwrap();
    let board_id = ctx.create_board("Defaults").await;

    let (status, list) = ctx
        .send("POST", &format!("/v1/boards/{}/lists", board_id), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(list["name"], "New List");
    let list_id = id_of(&list);

    let (status, task) = ctx.send("POST", &format!("/v1/lists/{}/tasks", list_id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["title"], "New Task");
}
