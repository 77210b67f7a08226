//! Task endpoint tests, driven through the full router

mod common;

use axum::http::StatusCode;
use common::{TestContext, TestUser};
use serde_json::{json, Value};
use uuid::Uuid;

async fn create(ctx: &TestContext, user: &TestUser, body: Value) -> Value {
    let (status, task) = ctx.json("POST", "/tasks", Some(&user.token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {}", task);
    task
}

fn descriptions(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|task| task["description"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_ignores_owner_in_body() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;

    let task = create(
        &ctx,
        &ann,
        json!({ "description": "  buy milk ", "owner": Uuid::new_v4() }),
    )
    .await;

    assert_eq!(task["owner"], ann.id.as_str());
    assert_eq!(task["description"], "buy milk");
    assert!(task["createdAt"].is_string());
    assert!(task["updatedAt"].is_string());
}

#[tokio::test]
async fn test_create_requires_description() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;

    let (status, body) = ctx
        .json("POST", "/tasks", Some(&ann.token), Some(json!({ "completed": true })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "description");

    let (status, _) = ctx
        .json("POST", "/tasks", Some(&ann.token), Some(json!({ "description": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tasks_of_others_are_invisible() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;
    let bob = ctx.signup("Bob", "b@x.com", "longenough1").await;

    let task = create(&ctx, &ann, json!({ "description": "ann's secret" })).await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());
    let missing = format!("/tasks/{}", Uuid::new_v4());

    let (status, body) = ctx.json("GET", &uri, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, missing_body) = ctx.json("GET", &missing, Some(&bob.token), None).await;
    assert_eq!(body, missing_body);

    let (status, _) = ctx
        .json("PATCH", &uri, Some(&bob.token), Some(json!({ "completed": true })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.json("DELETE", &uri, Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = ctx.json("GET", "/tasks", Some(&bob.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));

    let (status, task) = ctx.json("GET", &uri, Some(&ann.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["completed"], false);
}

#[tokio::test]
async fn test_malformed_task_id() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;

    let (status, body) = ctx.json("GET", "/tasks/not-an-id", Some(&ann.token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid task id" }));
}

#[tokio::test]
async fn test_update_task() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;
    let task = create(&ctx, &ann, json!({ "description": "buy milk" })).await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let (status, updated) = ctx
        .json(
            "PATCH",
            &uri,
            Some(&ann.token),
            Some(json!({ "completed": true, "description": "buy oat milk" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["description"], "buy oat milk");
    assert_eq!(updated["id"], task["id"]);
}

#[tokio::test]
async fn test_update_rejects_owner_change() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;
    let bob = ctx.signup("Bob", "b@x.com", "longenough1").await;
    let task = create(&ctx, &ann, json!({ "description": "buy milk" })).await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = ctx
        .json(
            "PATCH",
            &uri,
            Some(&ann.token),
            Some(json!({ "completed": true, "owner": bob.id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid update property" }));

    let (_, unchanged) = ctx.json("GET", &uri, Some(&ann.token), None).await;
    assert_eq!(unchanged["completed"], false);
    assert_eq!(unchanged["owner"], ann.id.as_str());
}

#[tokio::test]
async fn test_delete_task_returns_it() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;
    let task = create(&ctx, &ann, json!({ "description": "buy milk" })).await;
    let uri = format!("/tasks/{}", task["id"].as_str().unwrap());

    let (status, deleted) = ctx.json("DELETE", &uri, Some(&ann.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], task["id"]);

    let (status, _) = ctx.json("GET", &uri, Some(&ann.token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filter_sort_and_paginate() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;

    create(&ctx, &ann, json!({ "description": "b", "completed": true })).await;
    create(&ctx, &ann, json!({ "description": "a" })).await;
    create(&ctx, &ann, json!({ "description": "d", "completed": true })).await;
    create(&ctx, &ann, json!({ "description": "c" })).await;

    let (_, all) = ctx.json("GET", "/tasks", Some(&ann.token), None).await;
    assert_eq!(descriptions(&all), ["b", "a", "d", "c"]);

    let (_, done) = ctx.json("GET", "/tasks?completed=true", Some(&ann.token), None).await;
    assert_eq!(descriptions(&done), ["b", "d"]);

    // Anything but "true" means not completed
    let (_, open) = ctx.json("GET", "/tasks?completed=yes", Some(&ann.token), None).await;
    assert_eq!(descriptions(&open), ["a", "c"]);

    let (_, sorted) = ctx
        .json("GET", "/tasks?sortBy=description:asc", Some(&ann.token), None)
        .await;
    assert_eq!(descriptions(&sorted), ["a", "b", "c", "d"]);

    let (_, sorted) = ctx
        .json("GET", "/tasks?sortBy=description:desc", Some(&ann.token), None)
        .await;
    assert_eq!(descriptions(&sorted), ["d", "c", "b", "a"]);

    let (_, page) = ctx
        .json("GET", "/tasks?sortBy=description&limit=2&skip=1", Some(&ann.token), None)
        .await;
    assert_eq!(descriptions(&page), ["b", "c"]);

    // Unparseable or zero values are ignored
    let (status, ignored) = ctx
        .json(
            "GET",
            "/tasks?limit=abc&skip=-1&sortBy=colour:desc",
            Some(&ann.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(descriptions(&ignored), ["b", "a", "d", "c"]);

    let (_, unlimited) = ctx.json("GET", "/tasks?limit=0", Some(&ann.token), None).await;
    assert_eq!(unlimited.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_empty_completed_query_does_not_filter() {
    let ctx = TestContext::new();
    let ann = ctx.signup("Ann", "a@x.com", "longenough1").await;

    create(&ctx, &ann, json!({ "description": "done", "completed": true })).await;
    create(&ctx, &ann, json!({ "description": "open" })).await;

    let (status, all) = ctx
        .json("GET", "/tasks?completed=&limit=&skip=", Some(&ann.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(descriptions(&all), ["done", "open"]);
}
