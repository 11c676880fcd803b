mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use serde_json::{json, Value};

use common::{bearer, TestContext};

#[actix_web::test]
async fn create_update_and_list_a_task() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/workspaces")
        .insert_header(bearer("u1"))
        .set_json(json!({"name": "W1", "organizationId": "org_w1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let workspace: Value = test::read_body_json(resp).await;
    assert_eq!(workspace["members"][0]["role"], "ADMIN");
    assert_eq!(workspace["_count"]["members"], 1);

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer("u1"))
        .set_json(json!({"title": "Ship report", "workspace_id": "org_w1"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Value = test::read_body_json(resp).await;
    assert_eq!(task["status"], "TODO");
    assert_eq!(task["priority"], "NONE");
    let task_id = task["id"].as_str().unwrap().to_string();

    let mut updated = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::patch()
            .uri(&format!("/api/tasks/{}", task_id))
            .insert_header(bearer("u1"))
            .set_json(json!({"status": "DONE"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        updated.push(body);
    }
    assert_eq!(updated[0]["status"], updated[1]["status"]);
    assert_eq!(updated[0]["title"], updated[1]["title"]);

    let req = test::TestRequest::get()
        .uri("/api/tasks?workspaceId=org_w1")
        .insert_header(bearer("u1"))
        .to_request();
    let tasks: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["status"], "DONE");
    assert_eq!(tasks[0]["title"], "Ship report");
}

#[actix_web::test]
async fn sub_tasks_only_appear_under_their_parent() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer("u1"))
        .set_json(json!({"title": "Parent"}))
        .to_request();
    let parent: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(parent["workspace_id"], "user_u1");
    let parent_id = parent["id"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer("u1"))
        .set_json(json!({"title": "Child", "parent_id": parent_id}))
        .to_request();
    let child: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::get().uri("/api/tasks").insert_header(bearer("u1")).to_request();
    let tasks: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], parent["id"]);
    assert_eq!(tasks[0]["_count"]["sub_tasks"], 1);
    assert_eq!(tasks[0]["sub_tasks"][0]["id"], child["id"]);

    // deleting the parent takes the child with it
    let req = test::TestRequest::delete()
        .uri(&format!("/api/tasks/{}", parent_id))
        .insert_header(bearer("u1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::put()
        .uri(&format!("/api/tasks/{}", child["id"].as_str().unwrap()))
        .insert_header(bearer("u1"))
        .set_json(json!({"title": "Orphan"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn null_clears_a_date_and_absent_keeps_it() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer("u1"))
        .set_json(json!({"title": "Dated", "due_date": "2024-05-01"}))
        .to_request();
    let task: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());
    assert!(task["due_date"].is_string());

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer("u1"))
        .set_json(json!({}))
        .to_request();
    let unchanged: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(unchanged["due_date"], task["due_date"]);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer("u1"))
        .set_json(json!({"due_date": null}))
        .to_request();
    let cleared: Value = test::call_and_read_body_json(&app, req).await;
    assert!(cleared["due_date"].is_null());
    assert_eq!(cleared["title"], "Dated");
}

#[actix_web::test]
async fn missing_title_and_bad_status_are_rejected() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer("u1"))
        .set_json(json!({"title": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Title is required");

    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer("u1"))
        .set_json(json!({"title": "x", "status": "SOMEDAY"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn requests_without_a_token_get_401() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    for req in [
        test::TestRequest::get().uri("/api/tasks").to_request(),
        test::TestRequest::get().uri("/api/workspaces").to_request(),
        test::TestRequest::get()
            .uri("/api/tasks")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({"error": "Unauthorized"}));
    }

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn workspace_listing_includes_the_personal_workspace() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    let req = test::TestRequest::get().uri("/api/tasks").insert_header(bearer("u1")).to_request();
    let tasks: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(tasks.is_empty());

    let req = test::TestRequest::post()
        .uri("/api/workspaces")
        .insert_header(bearer("u1"))
        .set_json(json!({"name": "Team", "organizationId": "org_team"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/workspaces")
        .insert_header(bearer("u2"))
        .set_json(json!({"name": "Stolen", "organizationId": "org_team"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get().uri("/api/workspaces").insert_header(bearer("u1")).to_request();
    let workspaces: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let mut ids: Vec<&str> = workspaces.iter().map(|w| w["id"].as_str().unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec!["org_team", "user_u1"]);

    let req = test::TestRequest::get().uri("/api/workspaces").insert_header(bearer("u2")).to_request();
    let workspaces: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    assert!(workspaces.is_empty());
}
