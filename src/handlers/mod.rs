pub mod common;
pub mod dishes;
pub mod orders;
pub mod reports;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::AppState;

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/:id", put(orders::update_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/orders/summary", get(orders::order_summary))
        .route("/dishes/resolve", get(dishes::resolve_dish))
        .route("/dishes/:id/photos", post(dishes::append_photo))
        .route("/reports/aggregation", get(reports::aggregation))
        .route("/reports/export", get(reports::export))
}
