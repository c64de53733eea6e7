mod support;

use std::sync::Arc;

use account_server::application::user_service::UserService;
use account_server::domain::activity::{ActivityDetails, ActivityEntry};
use account_server::presentation::middleware::{RequestIdMiddleware, TimingMiddleware};
use account_server::server::configure;
use actix_web::http::StatusCode;
use actix_web::{App, test};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use support::{InMemoryUserRepository, UnreachableStore, bearer, keys, ten_orders, user, user_id};

macro_rules! app_with {
    ($service:expr) => {{
        let service: UserService = $service;
        App::new()
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .configure(move |cfg| configure(cfg, service, keys()))
    }};
}

async fn seeded(users: &[&str]) -> Arc<InMemoryUserRepository> {
    let repo = Arc::new(InMemoryUserRepository::default());
    for id in users {
        repo.insert(user(id)).await;
    }
    repo
}

#[actix_web::test]
async fn stats_are_returned_without_an_envelope() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(repo, Arc::new(ten_orders())))).await;

    let req = test::TestRequest::get()
        .uri("/api/user/stats")
        .insert_header(bearer("user123"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(
        body,
        json!({"totalOrders": 10, "recentActivity": [], "accountBalance": 100.5})
    );
}

#[actix_web::test]
async fn stats_failure_hides_the_cause() {
    let app = test::init_service(app_with!(UserService::new(
        Arc::new(UnreachableStore),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::get()
        .uri("/api/user/stats")
        .insert_header(bearer("user123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({"success": false, "error": "Failed to fetch user statistics"})
    );
}

#[actix_web::test]
async fn preferences_merge_into_existing_record() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(
        repo.clone(),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::post()
        .uri("/api/user/update-preferences?userId=user123")
        .insert_header(bearer("user123"))
        .set_json(json!({"theme": "dark", "notifications": true}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], "user123");
    assert_eq!(
        body["user"]["preferences"],
        json!({"theme": "dark", "notifications": true})
    );
    assert!(body["user"].get("passwordHash").is_none());

    let req = test::TestRequest::post()
        .uri("/api/user/update-preferences?userId=user123")
        .insert_header(bearer("user123"))
        .set_json(json!({"theme": "light", "language": "de-DE"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["user"]["preferences"],
        json!({"theme": "light", "notifications": true, "language": "de-DE"})
    );

    let stored = repo.get(&user_id("user123")).await.unwrap();
    assert_eq!(stored.preferences.len(), 3);
}

#[actix_web::test]
async fn preferences_for_missing_user_are_not_written() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(
        repo.clone(),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::post()
        .uri("/api/user/update-preferences?userId=ghost")
        .insert_header(bearer("ghost"))
        .set_json(json!({"theme": "dark"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Failed to update user preferences");
    assert_eq!(repo.len().await, 1);
    assert!(repo.get(&user_id("ghost")).await.is_none());
}

#[actix_web::test]
async fn invalid_preferences_are_rejected_with_the_fixed_message() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(
        repo.clone(),
        Arc::new(ten_orders()),
    )))
    .await;

    for payload in [
        json!({"favouriteColour": "teal"}),
        json!({"theme": "neon"}),
        json!(["theme", "dark"]),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/user/update-preferences?userId=user123")
            .insert_header(bearer("user123"))
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            json!({"success": false, "error": "Failed to update user preferences"})
        );
    }

    let stored = repo.get(&user_id("user123")).await.unwrap();
    assert!(stored.preferences.is_empty());
}

#[actix_web::test]
async fn preferences_need_a_user_id() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(repo, Arc::new(ten_orders())))).await;

    let req = test::TestRequest::post()
        .uri("/api/user/update-preferences")
        .insert_header(bearer("user123"))
        .set_json(json!({"theme": "dark"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn callers_cannot_touch_other_users() {
    let repo = seeded(&["user123", "user456"]).await;
    let app = test::init_service(app_with!(UserService::new(
        repo.clone(),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::post()
        .uri("/api/user/update-preferences?userId=user456")
        .insert_header(bearer("user123"))
        .set_json(json!({"theme": "dark"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(repo.get(&user_id("user456")).await.unwrap().preferences.is_empty());

    let req = test::TestRequest::get()
        .uri("/api/user/activity/user456")
        .insert_header(bearer("user123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Failed to fetch user activity");
}

#[actix_web::test]
async fn activity_is_returned_in_stored_order() {
    let repo = Arc::new(InMemoryUserRepository::default());
    let mut record = user("user123");
    let start = Utc::now();
    record.activity_log = vec![
        ActivityEntry::new("login".into(), ActivityDetails::new(), start),
        ActivityEntry::new(
            "purchase".into(),
            ActivityDetails::new(),
            start + Duration::minutes(5),
        ),
    ];
    repo.insert(record).await;
    let app = test::init_service(app_with!(UserService::new(repo, Arc::new(ten_orders())))).await;

    let req = test::TestRequest::get()
        .uri("/api/user/activity/user123")
        .insert_header(bearer("user123"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["success"], true);
    let actions: Vec<_> = body["activity"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, ["login", "purchase"]);

    let req = test::TestRequest::get()
        .uri("/api/user/activity/user123?order=newest&limit=1")
        .insert_header(bearer("user123"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["activity"].as_array().unwrap().len(), 1);
    assert_eq!(body["activity"][0]["action"], "purchase");
}

#[actix_web::test]
async fn empty_activity_log_is_an_empty_list() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(repo, Arc::new(ten_orders())))).await;

    let req = test::TestRequest::get()
        .uri("/api/user/activity/user123")
        .insert_header(bearer("user123"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body, json!({"success": true, "activity": []}));
}

#[actix_web::test]
async fn activity_failure_hides_the_cause() {
    let app = test::init_service(app_with!(UserService::new(
        Arc::new(UnreachableStore),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::get()
        .uri("/api/user/activity/user123")
        .insert_header(bearer("user123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body,
        json!({"success": false, "error": "Failed to fetch user activity"})
    );
}

#[actix_web::test]
async fn recorded_login_shows_up_in_stats() {
    let repo = seeded(&["user123"]).await;
    let before = repo.get(&user_id("user123")).await.unwrap().last_login_date;
    let app = test::init_service(app_with!(UserService::new(
        repo.clone(),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::post()
        .uri("/api/user/activity/user123")
        .insert_header(bearer("user123"))
        .set_json(json!({"action": "login", "details": {"ip": "203.0.113.9"}}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["entry"]["action"], "login");
    assert_eq!(body["entry"]["details"]["ip"], "203.0.113.9");

    let stored = repo.get(&user_id("user123")).await.unwrap();
    assert!(stored.last_login_date >= before);
    assert_eq!(stored.activity_log.len(), 1);

    let req = test::TestRequest::get()
        .uri("/api/user/stats")
        .insert_header(bearer("user123"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["recentActivity"][0]["action"], "login");
    assert_eq!(body["recentActivity"][0]["id"], stored.activity_log[0].id.to_string());
}

#[actix_web::test]
async fn nested_activity_details_are_rejected() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(
        repo.clone(),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::post()
        .uri("/api/user/activity/user123")
        .insert_header(bearer("user123"))
        .set_json(json!({"action": "purchase", "details": {"cart": {"items": 2}}}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Failed to record user activity");
    assert!(repo.get(&user_id("user123")).await.unwrap().activity_log.is_empty());
}

#[actix_web::test]
async fn user_routes_require_a_bearer_token() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(repo, Arc::new(ten_orders())))).await;

    let req = test::TestRequest::get().uri("/api/user/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"success": false, "error": "Unauthorized"}));

    let req = test::TestRequest::get()
        .uri("/api/user/stats")
        .insert_header(("Authorization", "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn health_is_public() {
    let app = test::init_service(app_with!(UserService::new(
        Arc::new(UnreachableStore),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn responses_carry_a_request_id() {
    let app = test::init_service(app_with!(UserService::new(
        Arc::new(UnreachableStore),
        Arc::new(ten_orders()),
    )))
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().contains_key("x-request-id"));

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("x-request-id", "trace-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get("x-request-id").unwrap(), "trace-42");
}

#[actix_web::test]
async fn responses_report_server_timing() {
    let repo = seeded(&["user123"]).await;
    let app = test::init_service(app_with!(UserService::new(repo, Arc::new(ten_orders())))).await;

    let req = test::TestRequest::get()
        .uri("/api/user/stats")
        .insert_header(bearer("user123"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let timing = resp.headers().get("server-timing").unwrap().to_str().unwrap();
    assert!(timing.starts_with("app;dur="));

    let req = test::TestRequest::get().uri("/api/user/stats").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key("server-timing"));
}
