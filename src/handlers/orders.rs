use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::errors::ServiceError;
use crate::handlers::common::{access_token, created_response, success_response};
use crate::services::orders::{CreateOrderRequest, OrderSelection};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderPayload {
    #[validate(length(min = 1, message = "employee_id is required"))]
    pub employee_id: String,
    #[validate(length(min = 1, message = "org_id is required"))]
    pub org_id: String,
    pub selection: OrderSelection,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CancelOrderPayload {
    #[validate(length(min = 1, message = "employee_id is required"))]
    pub employee_id: String,
    #[validate(length(min = 1, message = "org_id is required"))]
    pub org_id: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub employee_id: String,
    pub org_id: String,
    pub date: NaiveDate,
}

pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Response, ServiceError> {
    payload.validate()?;
    state
        .services
        .access
        .validate(&payload.org_id, &payload.employee_id, &access_token(&headers))
        .await?;

    let outcome = state.services.orders.create(payload).await?;
    if outcome.created {
        Ok(created_response(outcome))
    } else {
        Ok(success_response(outcome))
    }
}

pub async fn update_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<UpdateOrderPayload>,
) -> Result<Response, ServiceError> {
    payload.validate()?;
    state
        .services
        .access
        .validate(&payload.org_id, &payload.employee_id, &access_token(&headers))
        .await?;

    state
        .services
        .orders
        .update(&order_id, payload.selection)
        .await?;
    Ok(success_response(json!({ "order_id": order_id })))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<CancelOrderPayload>,
) -> Result<Response, ServiceError> {
    payload.validate()?;
    state
        .services
        .access
        .validate(&payload.org_id, &payload.employee_id, &access_token(&headers))
        .await?;

    state
        .services
        .orders
        .cancel(&order_id, &payload.reason)
        .await?;
    Ok(success_response(json!({ "order_id": order_id, "status": "cancelled" })))
}

pub async fn order_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SummaryQuery>,
) -> Result<Response, ServiceError> {
    state
        .services
        .access
        .validate(&query.org_id, &query.employee_id, &access_token(&headers))
        .await?;

    let summary = state
        .services
        .orders
        .summary(&query.employee_id, &query.org_id, query.date)
        .await?;
    Ok(success_response(summary))
}
