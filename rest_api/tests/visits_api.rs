// rest_api/tests/visits_api.rs

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use lib::clock::FixedClock;
use lib::config::SchedulingConfig;
use lib::directory::{Directory, InMemoryDirectory};
use lib::service::{PageLimits, VisitService};
use lib::storage_engine::Stores;
use models::medical::{DepartmentSummary, PatientSummary, Role, StaffMember};
use rest_api::{build_router, AppState};
use security::{issue_token, RolesConfig};

const SECRET: &[u8] = b"visits-api-test-secret";

async fn app() -> Router {
    let directory = Arc::new(InMemoryDirectory::new());
    for id in ["p-1", "p-2"] {
        directory
            .add_patient(PatientSummary {
                id: id.into(),
                first_name: "Pat".into(),
                last_name: id.into(),
                date_of_birth: None,
                phone: None,
                email: None,
            })
            .await;
    }
    directory
        .add_staff(StaffMember {
            id: "d-1".into(),
            first_name: "Greg".into(),
            last_name: "House".into(),
            role: Role::Doctor,
            specialization: Some("diagnostics".into()),
            department_id: Some("dep-1".into()),
        })
        .await;
    directory
        .add_department(DepartmentSummary {
            id: "dep-1".into(),
            name: "Diagnostics".into(),
            location: Some("Wing B".into()),
        })
        .await;

    // Monday 2030-01-07 06:00 UTC.
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2030, 1, 7, 6, 0, 0).unwrap()));
    let service = VisitService::new(
        Stores::in_memory(),
        Directory::from_in_memory(directory),
        SchedulingConfig::default(),
        clock,
    )
    .await
    .unwrap();
    let state = AppState::new(service, RolesConfig::default(), SECRET, PageLimits::default());
    build_router(state, Duration::from_secs(5))
}

fn bearer(role: Role) -> String {
    let sub = match role {
        Role::Admin => "a-1",
        Role::Doctor => "d-1",
        Role::Nurse => "n-1",
    };
    let token = issue_token(SECRET, sub, Some("tester"), role, chrono::Duration::hours(1)).unwrap();
    format!("Bearer {}", token)
}

async fn send(app: &Router, method: Method, uri: &str, role: Option<Role>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(role) = role {
        builder = builder.header(header::AUTHORIZATION, bearer(role));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn visit_body(patient: &str, at: &str) -> Value {
    json!({
        "patientId": patient,
        "visitType": "consultation",
        "priority": "medium",
        "reasonForVisit": "follow-up on labs",
        "assignedDoctorId": "d-1",
        "scheduledDateTime": at,
        "duration": 30,
        "location": "Room 101",
        "departmentId": "dep-1"
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn visits_require_a_token_and_permission() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/api/visits", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::GET, "/api/visits/audit", Some(Role::Nurse), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn conflicting_visit_returns_409_and_emergency_returns_201() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/visits",
        Some(Role::Nurse),
        Some(visit_body("p-1", "2030-01-08T10:00:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "pending");
    assert!(body.get("conflicts").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/visits",
        Some(Role::Nurse),
        Some(visit_body("p-2", "2030-01-08T10:15:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("conflict"));
    let dims: Vec<&str> = body["conflicts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["dimension"].as_str().unwrap())
        .collect();
    assert!(dims.contains(&"doctor"));
    assert!(dims.contains(&"location"));

    let mut emergency = visit_body("p-2", "2030-01-08T10:15:00Z");
    emergency["visitType"] = json!("emergency");
    let (status, body) = send(&app, Method::POST, "/api/visits", Some(Role::Nurse), Some(emergency)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["conflicts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn weekend_and_missing_fields_are_400_with_details() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/visits",
        Some(Role::Nurse),
        Some(visit_body("p-1", "2030-01-12T10:00:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("weekend"));
    assert!(body["details"].as_array().is_some());

    let (status, body) = send(&app, Method::POST, "/api/visits", Some(Role::Nurse), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"].as_array().unwrap().len() >= 2);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/visits",
        Some(Role::Nurse),
        Some(visit_body("p-404", "2030-01-08T10:00:00Z")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lifecycle_over_http() {
    let app = app().await;
    let (_, created) = send(
        &app,
        Method::POST,
        "/api/visits",
        Some(Role::Nurse),
        Some(visit_body("p-1", "2030-01-08T10:00:00Z")),
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let visit_uri = format!("/api/visits/{}", id);

    let (status, body) = send(
        &app,
        Method::PUT,
        &visit_uri,
        Some(Role::Doctor),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("pending"));

    let (status, _) = send(&app, Method::PUT, &visit_uri, Some(Role::Nurse), Some(json!({ "status": "scheduled" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/check-in", visit_uri),
        Some(Role::Nurse),
        Some(json!({ "vitals": { "bloodPressure": "118/76", "heartRate": 64 } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "checked_in");
    assert!(body["data"]["checkInDateTime"].is_string());

    let (status, body) = send(&app, Method::POST, &format!("{}/check-in", visit_uri), Some(Role::Nurse), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cannot check in"));

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("{}/check-out", visit_uri),
        Some(Role::Nurse),
        Some(json!({ "outcome": "discharged", "followUpRequired": false })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("{}/check-out", visit_uri),
        Some(Role::Doctor),
        Some(json!({ "outcome": "discharged", "followUpRequired": false })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = send(&app, Method::GET, &visit_uri, Some(Role::Nurse), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["patient"]["id"], "p-1");
    assert_eq!(body["data"]["doctor"]["lastName"], "House");
    assert_eq!(body["data"]["department"]["name"], "Diagnostics");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/visits/audit?visitId={}", id),
        Some(Role::Admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["create", "update", "check_in", "check_out"]);
    assert_eq!(body["data"][0]["actorIp"], "203.0.113.9");
}

#[tokio::test]
async fn delete_is_soft_and_second_delete_is_404() {
    let app = app().await;
    let (_, created) = send(
        &app,
        Method::POST,
        "/api/visits",
        Some(Role::Nurse),
        Some(visit_body("p-1", "2030-01-08T10:00:00Z")),
    )
    .await;
    let uri = format!("/api/visits/{}", created["data"]["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::DELETE, &uri, Some(Role::Doctor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["deletedAt"].is_string());

    let (status, _) = send(&app, Method::DELETE, &uri, Some(Role::Doctor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &uri, Some(Role::Doctor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/api/visits/not-a-uuid", Some(Role::Doctor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_upcoming_patient_and_availability_routes() {
    let app = app().await;
    for (patient, at) in [("p-1", "2030-01-08T10:00:00Z"), ("p-2", "2030-01-08T11:00:00Z")] {
        let (status, _) = send(&app, Method::POST, "/api/visits", Some(Role::Nurse), Some(visit_body(patient, at))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/visits?sortBy=scheduledDateTime&sortOrder=asc&limit=1",
        Some(Role::Nurse),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 2);
    assert_eq!(body["data"]["pagination"]["totalPages"], 2);
    assert_eq!(body["data"]["visits"][0]["patientId"], "p-1");

    let (status, _) = send(&app, Method::GET, "/api/visits?sortBy=color", Some(Role::Nurse), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/api/visits/upcoming", Some(Role::Nurse), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tomorrow"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, Method::GET, "/api/visits/patient/p-2", Some(Role::Nurse), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (status, _) = send(&app, Method::GET, "/api/visits/patient/p-404", Some(Role::Nurse), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/visits/availability?date=2030-01-08&doctorId=d-1&duration=30",
        Some(Role::Nurse),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let starts: Vec<&str> = body["data"]["availableSlots"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["start"].as_str().unwrap())
        .collect();
    assert!(!starts.contains(&"2030-01-08T10:00:00Z"));
    assert!(starts.contains(&"2030-01-08T10:30:00Z"));

    let (status, _) = send(&app, Method::GET, "/api/visits/availability?date=2030-01-08", Some(Role::Nurse), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
