mod common;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{dish, organization, page, record, TestApp};
use obed_api::errors::ServiceError;
use obed_api::services::orders::{CreateOrderRequest, OrderSelection};

fn may_10() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

fn create_request(key: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        employee_id: "recE1".to_string(),
        org_id: "recOrg1".to_string(),
        date: may_10(),
        selection: OrderSelection {
            main_dish_id: Some("recMain1".to_string()),
            side_dish_id: Some("recSide1".to_string()),
            extra_dish_ids: vec!["recSalad1".to_string(), "recSoup1".to_string()],
        },
        idempotency_key: Some(key.to_string()),
    }
}

fn mock_selection_dishes(no_side_needed: bool) -> Mock {
    Mock::given(method("GET")).and(path("/Dishes")).respond_with(
        ResponseTemplate::new(200).set_body_json(page(vec![
            record(
                "recMain1",
                json!({ "Name": "Плов", "Category": "Main", "RequiresSide": no_side_needed }),
            ),
            dish("recSide1", "Гречка", "Side"),
            dish("recSalad1", "Винегрет", "Salad"),
            dish("recSoup1", "Борщ", "Soup"),
        ])),
    )
}

#[tokio::test]
async fn second_create_for_same_triple_returns_existing_order() {
    let app = TestApp::new().await;

    // The existence query finds an active order for the triple.
    Mock::given(method("GET"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![record(
            "recO1",
            json!({
                "Order Date": "2024-05-10",
                "Employee": ["recE1"],
                "Org": ["recOrg1"],
                "Status": "Active"
            }),
        )])))
        .mount(&app.server)
        .await;
    // No writes of any kind may happen.
    Mock::given(method("POST"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.server)
        .await;

    let outcome = app
        .services
        .orders
        .create(create_request("k2"))
        .await
        .expect("create");
    assert_eq!(outcome.order_id, "recO1");
    assert!(!outcome.created);
}

#[tokio::test]
async fn create_persists_active_order_with_meal_box_and_lines() {
    let app = TestApp::new().await;

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
    mock_selection_dishes(false).mount(&app.server).await;

    Mock::given(method("POST"))
        .and(path("/MealBoxes"))
        .and(body_partial_json(json!({
            "fields": { "Main Name": "Плов", "Side Name": "Гречка", "MB Label": "Плов + Гречка" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recMB1", json!({}))),
        )
        .expect(1)
        .mount(&app.server)
        .await;
    // Standard policy keeps both extras: salad line then soup line, written
    // before the order itself.
    Mock::given(method("POST"))
        .and(path("/OrderLines"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recL1", json!({}))),
        )
        .expect(2)
        .mount(&app.server)
        .await;
    // The order arrives last, carrying both link lists in one create.
    Mock::given(method("POST"))
        .and(path("/Orders"))
        .and(body_partial_json(json!({
            "fields": {
                "Order Date": "2024-05-10",
                "Employee": ["recE1"],
                "Org": ["recOrg1"],
                "Status": "Active",
                "Meal Boxes": ["recMB1"],
                "Order Lines": ["recL1", "recL1"]
            }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recO1", json!({}))),
        )
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/Orders/recO1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.server)
        .await;

    let outcome = app
        .services
        .orders
        .create(create_request("k1"))
        .await
        .expect("create");
    assert_eq!(outcome.order_id, "recO1");
    assert!(outcome.created);
}

#[tokio::test]
async fn light_policy_drops_the_salad_and_keeps_the_soup() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Organizations/recOrg1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(organization("recOrg1", "ООО Ромашка", "Light")),
        )
        .mount(&app.server)
        .await;
    mock_selection_dishes(false).mount(&app.server).await;

    Mock::given(method("POST"))
        .and(path("/MealBoxes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recMB1", json!({}))),
        )
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Orders"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recO1", json!({}))),
        )
        .mount(&app.server)
        .await;
    // Exactly one line, and it is the soup.
    Mock::given(method("POST"))
        .and(path("/OrderLines"))
        .and(body_partial_json(json!({
            "fields": { "Item (Menu Item)": ["recSoup1"], "Item Name": "Борщ" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recL1", json!({}))),
        )
        .expect(1)
        .mount(&app.server)
        .await;

    let outcome = app
        .services
        .orders
        .create(create_request("k1"))
        .await
        .expect("create");
    assert!(outcome.created);
}

#[tokio::test]
async fn main_that_forbids_a_side_gets_the_side_cleared() {
    let app = TestApp::new().await;

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
    mock_selection_dishes(true).mount(&app.server).await;

    // The meal box is created without a side name or composite label.
    Mock::given(method("POST"))
        .and(path("/MealBoxes"))
        .and(body_partial_json(json!({
            "fields": { "Main Name": "Плов", "MB Label": "Плов" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recMB1", json!({}))),
        )
        .expect(1)
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Orders"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recO1", json!({}))),
        )
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/OrderLines"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recL1", json!({}))),
        )
        .mount(&app.server)
        .await;

    let outcome = app
        .services
        .orders
        .create(create_request("k1"))
        .await
        .expect("create");
    assert!(outcome.created);
}

#[tokio::test]
async fn failed_line_write_leaves_no_order_behind() {
    let app = TestApp::new().await;

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
    mock_selection_dishes(false).mount(&app.server).await;
    Mock::given(method("POST"))
        .and(path("/MealBoxes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recMB1", json!({}))),
        )
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/OrderLines"))
        .respond_with(ResponseTemplate::new(500).set_body_string("line store down"))
        .mount(&app.server)
        .await;
    // The order record is never written, so a retry starts from scratch
    // instead of short-circuiting onto an order missing its extras.
    Mock::given(method("POST"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.server)
        .await;

    let err = app
        .services
        .orders
        .create(create_request("k1"))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Store { status: Some(500), .. });
}

#[tokio::test]
async fn summary_resolves_labels_and_extra_names() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![record(
            "recO1",
            json!({
                "Order Date": "2024-05-10",
                "Employee": ["recE1"],
                "Org": ["recOrg1"],
                "Status": "Active",
                "Meal Boxes": ["recMB1"],
                "Order Lines": ["recL1"]
            }),
        )])))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/MealBoxes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![record(
            "recMB1",
            json!({ "Main Name": "Плов", "Side Name": "Гречка" }),
        )])))
        .mount(&app.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/OrderLines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![record(
            "recL1",
            json!({ "Item (Menu Item)": ["recSoup1"], "Item Name": "Борщ", "Quantity": 1 }),
        )])))
        .mount(&app.server)
        .await;

    let summary = app
        .services
        .orders
        .summary("recE1", "recOrg1", may_10())
        .await
        .expect("summary")
        .expect("active order present");
    assert_eq!(summary.order_id, "recO1");
    assert_eq!(summary.meal_boxes, vec!["Плов + Гречка"]);
    assert_eq!(summary.extras, vec!["Борщ"]);
}

#[tokio::test]
async fn summary_without_active_order_is_none() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![])))
        .mount(&app.server)
        .await;

    let summary = app
        .services
        .orders
        .summary("recE1", "recOrg1", may_10())
        .await
        .expect("summary");
    assert!(summary.is_none());
}

#[tokio::test]
async fn cancel_transitions_active_to_cancelled_with_reason() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path("/Orders/recO1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record(
            "recO1",
            json!({
                "Order Date": "2024-05-10",
                "Employee": ["recE1"],
                "Org": ["recOrg1"],
                "Status": "Active"
            }),
        )))
        .mount(&app.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/Orders/recO1"))
        .and(body_partial_json(json!({
            "fields": { "Status": "Cancelled", "Cancel Reason": "sick day" }
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(record("recO1", json!({}))),
        )
        .expect(1)
        .mount(&app.server)
        .await;

    app.services
        .orders
        .cancel("recO1", "sick day")
        .await
        .expect("cancel");
}

#[tokio::test]
async fn cancelling_a_cancelled_order_is_a_no_op_success() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path("/Orders/recO1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record(
            "recO1",
            json!({
                "Order Date": "2024-05-10",
                "Employee": ["recE1"],
                "Org": ["recOrg1"],
                "Status": "Cancelled"
            }),
        )))
        .mount(&app.server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/Orders/recO1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.server)
        .await;

    app.services
        .orders
        .cancel("recO1", "again")
        .await
        .expect("second cancel must succeed");
}

#[tokio::test]
async fn update_of_cancelled_order_is_a_conflict() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path("/Orders/recO1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record(
            "recO1",
            json!({
                "Order Date": "2024-05-10",
                "Employee": ["recE1"],
                "Org": ["recOrg1"],
                "Status": "Cancelled"
            }),
        )))
        .mount(&app.server)
        .await;

    let selection = OrderSelection {
        main_dish_id: Some("recMain1".to_string()),
        ..Default::default()
    };
    let err = app
        .services
        .orders
        .update("recO1", selection)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn update_of_missing_order_is_not_found() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path("/Orders/recMissing1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&app.server)
        .await;

    let selection = OrderSelection {
        main_dish_id: Some("recMain1".to_string()),
        ..Default::default()
    };
    let err = app
        .services
        .orders
        .update("recMissing1", selection)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn store_failure_surfaces_status_and_body() {
    let app = TestApp::new().await;

    Mock::given(method("GET"))
        .and(path("/Orders"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&app.server)
        .await;

    let err = app
        .services
        .orders
        .create(create_request("k1"))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        ServiceError::Store { status: Some(429), ref body } if body == "rate limited"
    );
}
