mod common;

use actix_web::http::StatusCode;
use actix_web::{test, App};
use serde_json::{json, Value};

use common::{bearer, signed, TestContext};
use taskhub_backend::models::membership::Role;
use taskhub_backend::store::TaskHubStore;

fn delivery(id: &str, body: &Value) -> test::TestRequest {
    let raw = body.to_string();
    let mut req = test::TestRequest::post().uri("/api/webhooks/provider");
    for header in signed(id, &raw) {
        req = req.insert_header(header);
    }
    req.insert_header(("content-type", "application/json")).set_payload(raw)
}

#[actix_web::test]
async fn replayed_organization_created_leaves_one_workspace() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    let created = json!({"type": "organization.created", "data": {"id": "org_9", "name": "Nine"}});
    for _ in 0..2 {
        let resp = test::call_service(&app, delivery("msg_1", &created).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let joined = json!({
        "type": "organizationMembership.created",
        "data": {
            "organization": {"id": "org_9"},
            "public_user_data": {"user_id": "u1"},
            "role": "org:admin"
        }
    });
    for _ in 0..2 {
        let resp = test::call_service(&app, delivery("msg_2", &joined).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::get().uri("/api/workspaces").insert_header(bearer("u1")).to_request();
    let workspaces: Vec<Value> = test::call_and_read_body_json(&app, req).await;
    let matching: Vec<&Value> = workspaces.iter().filter(|w| w["id"] == "org_9").collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0]["_count"]["members"], 1);
    assert_eq!(matching[0]["members"][0]["role"], "ADMIN");
}

#[actix_web::test]
async fn sync_updates_roles_names_and_deletions() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    let events = [
        json!({"type": "organization.created", "data": {"id": "org_s", "name": "Sync"}}),
        json!({"type": "organization.updated", "data": {"id": "org_s", "name": "Synced"}}),
        json!({"type": "membership.created", "data": {
            "organization": {"id": "org_s"}, "public_user_data": {"user_id": "u2"}, "role": "org:admin"}}),
        json!({"type": "organizationMembership.updated", "data": {
            "organization": {"id": "org_s"}, "public_user_data": {"user_id": "u2"}, "role": "org:member"}}),
    ];
    for (i, event) in events.iter().enumerate() {
        let resp = test::call_service(&app, delivery(&format!("msg_{}", i), event).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert_eq!(ctx.store.find_workspace("org_s").await.unwrap().unwrap().name, "Synced");
    let member = ctx.store.find_membership("org_s", "u2").await.unwrap().unwrap();
    assert_eq!(member.role, Role::Member);

    let left = json!({"type": "organizationMembership.deleted", "data": {
        "organization": {"id": "org_s"}, "public_user_data": {"user_id": "u2"}}});
    for _ in 0..2 {
        let resp = test::call_service(&app, delivery("msg_left", &left).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert!(ctx.store.find_membership("org_s", "u2").await.unwrap().is_none());

    let gone = json!({"type": "organization.deleted", "data": {"id": "org_s", "deleted": true}});
    for _ in 0..2 {
        let resp = test::call_service(&app, delivery("msg_gone", &gone).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    assert!(ctx.store.find_workspace("org_s").await.unwrap().is_none());
}

#[actix_web::test]
async fn unverified_deliveries_change_nothing() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;
    let body = json!({"type": "organization.created", "data": {"id": "org_x", "name": "X"}}).to_string();

    let unsigned = test::TestRequest::post()
        .uri("/api/webhooks/provider")
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, unsigned).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut tampered = test::TestRequest::post().uri("/api/webhooks/provider");
    for header in signed("msg_t", &body) {
        tampered = tampered.insert_header(header);
    }
    let tampered = tampered.set_payload(body.replace("\"X\"", "\"Y\"")).to_request();
    let resp = test::call_service(&app, tampered).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = test::read_body_json(resp).await;
    assert!(error["error"].as_str().unwrap().starts_with("Invalid webhook"));

    let extreme = test::TestRequest::post()
        .uri("/api/webhooks/provider")
        .insert_header(("svix-id", "msg_min"))
        .insert_header(("svix-timestamp", "-9223372036854775808"))
        .insert_header(("svix-signature", "v1,AAAA"))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, extreme).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "Invalid webhook: Timestamp outside tolerance window");

    assert!(ctx.store.find_workspace("org_x").await.unwrap().is_none());
}

#[actix_web::test]
async fn unknown_events_are_acknowledged_and_store_failures_are_500() {
    let ctx = TestContext::new();
    let app = test::init_service(App::new().configure(|cfg| ctx.data.configure(cfg))).await;

    let unknown = json!({"type": "user.created", "data": {"id": "u1"}});
    let resp = test::call_service(&app, delivery("msg_u", &unknown).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    // membership for an organization that was never synced
    let early = json!({"type": "organizationMembership.created", "data": {
        "organization": {"id": "org_missing"}, "public_user_data": {"user_id": "u1"}, "role": "org:member"}});
    let resp = test::call_service(&app, delivery("msg_e", &early).to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
