//! HTTP surface behavior: auth, role gates, error status mapping and
//! district isolation, through the real route tree with the in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use actix_web::web::Data;
use actix_web::{App, test};
use chrono::NaiveDate;
use serde_json::json;

use districthr::auth::jwt::generate_token;
use districthr::config::Config;
use districthr::external::audit::NoopAuditSink;
use districthr::external::directory::StaticDirectory;
use districthr::external::recommend::NoopRecommender;
use districthr::model::employee::Employee;
use districthr::model::leave_type::LeaveType;
use districthr::model::role::Role;
use districthr::routes;
use districthr::store::memory::MemoryStore;
use districthr::workflow::WorkflowService;

const DISTRICT: u64 = 10;
const OTHER_DISTRICT: u64 = 20;
const EMPLOYEE: u64 = 1000;
const SECRET: &str = "test-secret";

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: SECRET.to_string(),
        server_addr: String::new(),
        rate_protected_per_min: 10_000,
        recommend_url: None,
        recommend_timeout_ms: 200,
        api_prefix: "/api".to_string(),
    }
}

fn workflow_service() -> Data<WorkflowService> {
    let store = Arc::new(MemoryStore::new());
    store.add_leave_type(LeaveType {
        id: 2,
        district_id: DISTRICT,
        name: "Sick Leave".to_string(),
        is_paid: true,
    });

    let directory = Arc::new(StaticDirectory::new());
    directory.add_employee(Employee {
        id: EMPLOYEE,
        district_id: DISTRICT,
        user_id: Some(EMPLOYEE),
        first_name: "Test".to_string(),
        last_name: "Employee".to_string(),
        email: "employee@district.k12.us".to_string(),
        is_substitute: false,
        status: "active".to_string(),
    });

    Data::new(WorkflowService::new(
        store,
        directory,
        Arc::new(NoopRecommender),
        Arc::new(NoopAuditSink),
        Duration::from_millis(200),
    ))
}

fn token(role: Role, district_id: u64, employee_id: Option<u64>) -> String {
    generate_token(1, "tester".to_string(), role.id(), district_id, employee_id, SECRET, 3600)
}

fn peer() -> SocketAddr {
    "127.0.0.1:12345".parse().unwrap()
}

macro_rules! init_app {
    ($svc:expr, $config:expr) => {{
        let config = $config.clone();
        test::init_service(
            App::new()
                .app_data($svc.clone())
                .app_data(Data::new($config.clone()))
                .configure(move |cfg| routes::configure(cfg, config.clone())),
        )
        .await
    }};
}

fn authed(method: test::TestRequest, uri: &str, token: &str) -> test::TestRequest {
    method
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

#[actix_web::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = init_app!(workflow_service(), test_config());

    let req = test::TestRequest::get()
        .uri("/api/v1/timecards")
        .peer_addr(peer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn leave_flow_over_http() {
    let svc = workflow_service();
    let config = test_config();
    let app = init_app!(svc, config);
    let admin = token(Role::Admin, DISTRICT, None);

    // Mon Jan 1 2024 through Sun Jan 7 2024: five weekday cards.
    let req = authed(test::TestRequest::post(), "/api/v1/leave", &admin)
        .set_json(json!({
            "employee_id": EMPLOYEE,
            "leave_type_id": 2,
            "start_date": "2024-01-01",
            "end_date": "2024-01-07",
            "reason": "medical",
            "substitute_required": false
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["request"]["status"], "pending");
    assert_eq!(body["time_cards"].as_array().unwrap().len(), 5);
    let leave_id = body["request"]["id"].as_u64().unwrap();

    let req = authed(
        test::TestRequest::put(),
        &format!("/api/v1/leave/{leave_id}/approve"),
        &admin,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["request"]["status"], "approved");
    assert_eq!(body["affected_count"], 5);

    // Closed exactly once: the second approval conflicts.
    let req = authed(
        test::TestRequest::put(),
        &format!("/api/v1/leave/{leave_id}/approve"),
        &admin,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
}

#[actix_web::test]
async fn employee_role_cannot_admin_approve() {
    let svc = workflow_service();
    let config = test_config();
    let app = init_app!(svc, config);
    let admin = token(Role::Admin, DISTRICT, None);
    let employee = token(Role::Employee, DISTRICT, Some(EMPLOYEE));

    let req = authed(test::TestRequest::post(), "/api/v1/timecards", &admin)
        .set_json(json!({
            "employee_id": EMPLOYEE,
            "work_date": "2024-01-08",
            "total_hours": 8.0
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let card_id = body["id"].as_u64().unwrap();

    let req = authed(
        test::TestRequest::put(),
        &format!("/api/v1/timecards/{card_id}/approve-admin"),
        &employee,
    )
    .set_json(json!({}))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn out_of_order_transition_maps_to_conflict() {
    let svc = workflow_service();
    let config = test_config();
    let app = init_app!(svc, config);
    let admin = token(Role::Admin, DISTRICT, None);

    let req = authed(test::TestRequest::post(), "/api/v1/timecards", &admin)
        .set_json(json!({
            "employee_id": EMPLOYEE,
            "work_date": "2024-01-08",
            "total_hours": 8.0
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let card_id = body["id"].as_u64().unwrap();

    let req = authed(
        test::TestRequest::put(),
        &format!("/api/v1/timecards/{card_id}/approve-admin"),
        &admin,
    )
    .set_json(json!({}))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 409);
    let body: serde_json::Value = test::read_body_json(resp).await;
    // The message names the expected prior state.
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("admin"));
    assert!(message.contains("secretary"));
}

#[actix_web::test]
async fn locked_card_maps_to_http_locked() {
    let svc = workflow_service();
    let config = test_config();
    let app = init_app!(svc, config);
    let admin = token(Role::Admin, DISTRICT, None);

    let req = authed(test::TestRequest::post(), "/api/v1/timecards", &admin)
        .set_json(json!({
            "employee_id": EMPLOYEE,
            "work_date": "2024-01-08",
            "total_hours": 8.0
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let card_id = body["id"].as_u64().unwrap();

    let req = authed(
        test::TestRequest::put(),
        &format!("/api/v1/timecards/{card_id}/lock"),
        &admin,
    )
    .set_json(json!({"reason": "payroll period closed"}))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = authed(
        test::TestRequest::put(),
        &format!("/api/v1/timecards/{card_id}/submit"),
        &admin,
    )
    .set_json(json!({}))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 423);
}

#[actix_web::test]
async fn cross_district_reads_return_not_found() {
    let svc = workflow_service();
    let config = test_config();
    let app = init_app!(svc, config);
    let admin = token(Role::Admin, DISTRICT, None);
    let foreign_admin = token(Role::Admin, OTHER_DISTRICT, None);

    let req = authed(test::TestRequest::post(), "/api/v1/timecards", &admin)
        .set_json(json!({
            "employee_id": EMPLOYEE,
            "work_date": "2024-01-08",
            "total_hours": 8.0
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = test::read_body_json(resp).await;
    let card_id = body["id"].as_u64().unwrap();

    let req = authed(
        test::TestRequest::get(),
        &format!("/api/v1/timecards/{card_id}"),
        &foreign_admin,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "time card not found");
}

#[actix_web::test]
async fn invalid_date_range_is_a_bad_request() {
    let svc = workflow_service();
    let config = test_config();
    let app = init_app!(svc, config);
    let admin = token(Role::Admin, DISTRICT, None);

    let req = authed(test::TestRequest::post(), "/api/v1/leave", &admin)
        .set_json(json!({
            "employee_id": EMPLOYEE,
            "leave_type_id": 2,
            "start_date": "2024-01-05",
            "end_date": "2024-01-01"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn list_endpoints_paginate() {
    let svc = workflow_service();
    let config = test_config();
    let app = init_app!(svc, config);
    let admin = token(Role::Admin, DISTRICT, None);

    for day in 8..=12 {
        let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        let req = authed(test::TestRequest::post(), "/api/v1/timecards", &admin)
            .set_json(json!({
                "employee_id": EMPLOYEE,
                "work_date": date,
                "total_hours": 8.0
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    let req = authed(
        test::TestRequest::get(),
        "/api/v1/timecards?page=1&per_page=2",
        &admin,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 5);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}
