mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{dish, employee, organization, page, record, TestApp};
use obed_api::config::AccessSettings;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = TestApp::new().await;
    let router = obed_api::app_router(app.state());

    let response = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_order_over_http_returns_created_envelope() {
    let app = TestApp::with_access(AccessSettings { open: true }).await;
    let router = obed_api::app_router(app.state());

    Mock::given(method("GET"))
        .and(path("/Employees/recE1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(employee("recE1", "Егоров Иван", "recOrg1", "")),
        )
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Organizations/recOrg1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(organization("recOrg1", "ООО Ромашка", "Standard")),
        )
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Dishes"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page(vec![dish("recMain1", "Плов", "Main")])),
        )
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/MealBoxes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record("recMB1", json!({}))))
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record("recO1", json!({}))))
        .mount(&app.server)
        .await;

    let payload = json!({
        "employee_id": "recE1",
        "org_id": "recOrg1",
        "date": "2024-05-10",
        "selection": { "main_dish_id": "recMain1" }
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["data"]["order_id"], json!("recO1"));
    assert_eq!(body["data"]["created"], json!(true));
}

#[tokio::test]
async fn wrong_token_is_an_opaque_forbidden() {
    let app = TestApp::new().await;
    let router = obed_api::app_router(app.state());

    Mock::given(method("GET"))
        .and(path("/Employees/recE1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(employee("recE1", "Егоров Иван", "recOrg1", "tok-secret")),
        )
        .mount(&app.server)
        .await;
    // The gate fails before the state machine touches the store.
    Mock::given(method("POST"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.server)
        .await;

    let payload = json!({
        "employee_id": "recE1",
        "org_id": "recOrg1",
        "date": "2024-05-10",
        "selection": { "main_dish_id": "recMain1" }
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-access-token", "tok-wrong")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    // Opaque by contract: no hint of whether the employee, org or token
    // was the problem.
    assert_eq!(
        body,
        json!({ "ok": false, "error": "forbidden", "error_kind": "auth" })
    );
}

#[tokio::test]
async fn missing_employee_looks_identical_to_wrong_token() {
    let app = TestApp::new().await;
    let router = obed_api::app_router(app.state());

    Mock::given(method("GET"))
        .and(path("/Employees/recGhost1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.server)
        .await;

    let payload = json!({
        "employee_id": "recGhost1",
        "org_id": "recOrg1",
        "date": "2024-05-10",
        "selection": { "main_dish_id": "recMain1" }
    });
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-access-token", "tok-any")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        json!({ "ok": false, "error": "forbidden", "error_kind": "auth" })
    );
}

#[tokio::test]
async fn csv_export_sets_content_type_and_attachment_name() {
    let app = TestApp::with_access(AccessSettings { open: true }).await;
    let router = obed_api::app_router(app.state());

    Mock::given(method("GET"))
        .and(path("/Organizations/recOrg1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(organization("recOrg1", "ООО Ромашка", "Standard")),
        )
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&app.server)
        .await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/reports/export?org_id=recOrg1&date=2024-05-10&format=csv")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"lunch-report-2024-05-10.csv\""
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("Сотрудник"));
}
